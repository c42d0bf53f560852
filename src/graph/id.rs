//! Identity types for the graph runtime.
//!
//! Node ids are process-unique newtypes over `u32`, handed out from a global
//! counter when a node is constructed. They key visited sets during graph
//! search and label nodes in logs and topology snapshots.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identifier of a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Allocate the next unused id.
    pub(crate) fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId(42);
        assert_eq!(format!("{}", id), "NodeId(42)");
        assert_eq!(format!("{:?}", id), "NodeId(42)");
    }

    #[test]
    fn test_next_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
