//! Test node builders

use crossbeam_channel::{unbounded, Receiver, Sender};
use plugin_graph::config::{EdgeConfig, GraphConfig, NodeConfig};
use plugin_graph::graph::nodes::{register_text_nodes, ChannelSink};
use plugin_graph::{Emitter, Item, Node, NodeOptions, NodeRegistry, Plugin, Result};

/// Plugin that records every item it processes and forwards a mapped copy
pub struct Recorder<T> {
    seen: Sender<T>,
    map: fn(T) -> Option<T>,
}

impl<T: Item> Recorder<T> {
    /// Record and swallow
    pub fn sink() -> (Self, Receiver<T>) {
        Self::mapping(|_| None)
    }

    /// Record and forward unchanged
    pub fn passthrough() -> (Self, Receiver<T>) {
        Self::mapping(Some)
    }

    pub fn mapping(map: fn(T) -> Option<T>) -> (Self, Receiver<T>) {
        let (seen, rx) = unbounded();
        (Self { seen, map }, rx)
    }
}

impl<T: Item> Plugin<T> for Recorder<T> {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn process(&mut self, item: T, _out: &Emitter<'_, T>) -> Result<Option<T>> {
        let _ = self.seen.send(item.clone());
        Ok((self.map)(item))
    }
}

/// Threaded recorder node and the receiver of what it processed
pub fn threaded_recorder<T: Item>() -> (Node<T>, Receiver<T>) {
    let (plugin, rx) = Recorder::sink();
    (Node::new(plugin, NodeOptions::new()).unwrap(), rx)
}

/// Inline recorder node and the receiver of what it processed
pub fn inline_recorder<T: Item>() -> (Node<T>, Receiver<T>) {
    let (plugin, rx) = Recorder::sink();
    (Node::new(plugin, NodeOptions::new().inline()).unwrap(), rx)
}

/// Text registry plus a `collect` kind that feeds the returned receiver
pub fn text_registry() -> (NodeRegistry<String>, Receiver<String>) {
    let mut registry = NodeRegistry::new();
    register_text_nodes(&mut registry);
    let (tx, rx) = unbounded();
    registry.register("collect", move |cfg| {
        Node::new(ChannelSink::with_sender(tx.clone()), cfg.options())
    });
    (registry, rx)
}

/// Linear graph of `kinds`, named `n0`, `n1`, ... and wired in order
pub fn chain_config(kinds: &[&str], threaded: bool) -> GraphConfig {
    let mut config = GraphConfig::new();
    for (i, kind) in kinds.iter().enumerate() {
        let node = NodeConfig::new(format!("n{}", i), *kind);
        config = config.with_node(if threaded { node } else { node.inline() });
        if i > 0 {
            config = config.with_edge(EdgeConfig::output(format!("n{}", i - 1), format!("n{}", i)));
        }
    }
    config
}
