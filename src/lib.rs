//! # plugin-graph: threaded dataflow graphs of processing plugins
//!
//! Independent stages ([`Plugin`]s) are hosted by [`Node`]s and wired into a
//! directed graph. Each threaded node drains its own FIFO mailbox on a
//! dedicated thread; inline nodes run on the caller's thread. Results fan out
//! to every output, or to a single output channel.
//!
//! ## Architecture
//!
//! - **Graph**: nodes, mailboxes, the dispatch loop, fan-out and search
//! - **Config**: TOML graph files declaring nodes by kind and their edges
//! - **Builder**: a registry of node kinds turning graph files into pipelines
//! - **Stages**: application stages, such as streaming chat over a model
//! - **Communication**: crossbeam channels between threads
//!
//! ## Example
//!
//! ```no_run
//! use plugin_graph::graph::{Channel, Direction, Node, NodeOptions};
//! use plugin_graph::graph::nodes::ChannelSink;
//!
//! fn main() -> plugin_graph::Result<()> {
//!     let upper = Node::callback(|s: String| Some(s.to_uppercase()))?;
//!     let (sink, rx) = ChannelSink::channel();
//!     let sink = Node::new(sink, NodeOptions::new().inline())?;
//!
//!     upper.connect(&sink, Direction::Output)?;
//!     upper.connect(|s: String| println!("saw {}", s), Direction::Output)?;
//!
//!     upper.input("hello".to_string())?;
//!     assert_eq!(rx.recv().unwrap(), "HELLO");
//!
//!     // Route a value to the second output only
//!     upper.output("direct".to_string(), Channel::Index(1))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod stages;

// Re-export commonly used types
pub use config::{ConfigValue, EdgeConfig, GraphConfig, LoggingConfig, NodeConfig};
pub use error::{GraphError, Result, ResultExt};
pub use graph::{
    Channel, Direction, Emitter, Item, Node, NodeOptions, NodeRegistry, Pipeline,
    PipelineBuilder, Plugin, TopologySnapshot,
};
