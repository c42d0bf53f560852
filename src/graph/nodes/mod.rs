//! Built-in node implementations.

pub mod channel_sink;
pub mod filter;
pub mod print_sink;
pub mod splitter;

pub use channel_sink::ChannelSink;
pub use filter::Filter;
pub use print_sink::PrintSink;
pub use splitter::Splitter;

use crate::graph::builder::NodeRegistry;
use crate::graph::callback::Callback;
use crate::graph::node::Node;

/// Register the string-processing node kinds used by text graphs.
///
/// | kind          | behavior                                   |
/// |---------------|--------------------------------------------|
/// | `passthrough` | forwards the line unchanged                |
/// | `uppercase`   | forwards the line upper-cased              |
/// | `lowercase`   | forwards the line lower-cased              |
/// | `trim`        | strips surrounding whitespace              |
/// | `skip-empty`  | drops blank lines                          |
/// | `words`       | emits each whitespace-separated word       |
/// | `print`       | writes to stdout (`prefix` param optional) |
pub fn register_text_nodes(registry: &mut NodeRegistry<String>) {
    registry.register("passthrough", |cfg| {
        Node::new(Callback::new(|s: String| Some(s)), cfg.options())
    });
    registry.register("uppercase", |cfg| {
        Node::new(Callback::new(|s: String| Some(s.to_uppercase())), cfg.options())
    });
    registry.register("lowercase", |cfg| {
        Node::new(Callback::new(|s: String| Some(s.to_lowercase())), cfg.options())
    });
    registry.register("trim", |cfg| {
        Node::new(Callback::new(|s: String| Some(s.trim().to_string())), cfg.options())
    });
    registry.register("skip-empty", |cfg| {
        Node::new(
            Filter::new(|s: &String| !s.trim().is_empty()),
            cfg.options(),
        )
    });
    registry.register("words", |cfg| {
        Node::new(
            Splitter::new(|s: String| {
                s.split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            }),
            cfg.options(),
        )
    });
    registry.register("print", |cfg| {
        let sink = match cfg.param("prefix").and_then(|v| v.as_str()) {
            Some(prefix) => PrintSink::with_prefix(prefix),
            None => PrintSink::new(),
        };
        Node::new(sink, cfg.options())
    });
}
