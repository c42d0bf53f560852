//! The stage contract.
//!
//! A [`Plugin`] is the logic a node runs for each item it receives. The node
//! owns the plugin, feeds it items one at a time, and routes whatever it
//! returns to its outputs. Plugins that produce several results per input
//! (streaming tokens, splitting records) push them through the [`Emitter`]
//! they are handed instead of, or as well as, returning a value.

use crate::error::{GraphError, Result};
use crate::graph::channel::Channel;
use crate::graph::id::NodeId;
use crate::graph::node::NodeCore;

/// Bound for values that travel along graph edges.
///
/// Broadcast and relay hand out copies, and items cross into dispatch threads.
pub trait Item: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Item for T {}

/// Processing logic hosted by a node.
pub trait Plugin<T: Item>: Send + 'static {
    /// Human-readable name, used for logs and as the default node name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Handle one input item.
    ///
    /// The returned value (if any) is broadcast to every output. Additional
    /// values may be emitted through `out` while processing.
    ///
    /// The provided implementation fails with [`GraphError::NotImplemented`],
    /// which stops a threaded node's dispatch loop.
    fn process(&mut self, item: T, out: &Emitter<'_, T>) -> Result<Option<T>> {
        let _ = (item, out);
        Err(GraphError::NotImplemented {
            plugin: self.name().to_string(),
        })
    }
}

/// Handle given to [`Plugin::process`] for emitting values mid-process.
pub struct Emitter<'a, T: Item> {
    core: &'a NodeCore<T>,
}

impl<'a, T: Item> Emitter<'a, T> {
    pub(crate) fn new(core: &'a NodeCore<T>) -> Self {
        Self { core }
    }

    /// Send `value` to the selected outputs of the hosting node.
    pub fn output(&self, value: impl Into<Option<T>>, channel: Channel) -> Result<()> {
        self.core.output(value.into(), channel)
    }

    /// Send `value` to every output of the hosting node.
    pub fn broadcast(&self, value: impl Into<Option<T>>) -> Result<()> {
        self.core.output(value.into(), Channel::All)
    }

    /// Number of outputs currently connected to the hosting node.
    pub fn outputs(&self) -> usize {
        self.core.output_count()
    }

    /// Id of the hosting node.
    pub fn node_id(&self) -> NodeId {
        self.core.id()
    }
}

/// `a::b::Thing<c::D>` -> `Thing`
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
