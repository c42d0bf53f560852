//! Serializable view of a live graph.
//!
//! Snapshots are taken by walking output edges from one or more root nodes.
//! They are plain data, so they can be printed, logged or shipped elsewhere
//! without holding any node handles.

use crate::graph::id::NodeId;
use crate::graph::node::{Node, NodeStats};
use crate::graph::plugin::Item;
use serde::Serialize;
use std::collections::HashSet;

/// Serializable snapshot of a single node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub threaded: bool,
    pub relay: bool,
    /// Items queued but not yet processed.
    pub pending: usize,
    pub stats: NodeStats,
}

/// Serializable snapshot of an output edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeSnapshot {
    pub from_node: NodeId,
    pub to_node: NodeId,
    /// Position in `from_node`'s output list.
    pub channel: usize,
}

/// Graph topology reachable from a set of roots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl TopologySnapshot {
    /// Capture every node reachable from `roots` via output edges.
    ///
    /// Nodes appear once each, in depth-first discovery order. Every edge is
    /// listed, duplicates and back edges included.
    pub fn capture<'a, T, I>(roots: I) -> Self
    where
        T: Item,
        I: IntoIterator<Item = &'a Node<T>>,
    {
        let mut snapshot = Self::default();
        let mut visited = HashSet::new();
        let mut stack: Vec<Node<T>> = Vec::new();

        for root in roots {
            stack.push(root.clone());
            while let Some(node) = stack.pop() {
                if !visited.insert(node.id()) {
                    continue;
                }

                snapshot.nodes.push(NodeSnapshot {
                    id: node.id(),
                    name: node.name().to_string(),
                    threaded: node.is_threaded(),
                    relay: node.is_relay(),
                    pending: node.pending(),
                    stats: node.stats(),
                });

                let outputs = node.outputs();
                for (channel, target) in outputs.iter().enumerate() {
                    snapshot.edges.push(EdgeSnapshot {
                        from_node: node.id(),
                        to_node: target.id(),
                        channel,
                    });
                }
                stack.extend(outputs.into_iter().rev());
            }
        }

        snapshot
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
