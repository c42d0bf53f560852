//! Dataflow graph runtime
//!
//! Independent processing stages ([`Plugin`]s) are hosted by [`Node`]s and
//! wired into a directed graph through each node's ordered output list.
//!
//! ```text
//! input() ─► Node A ─┬─► Node B ─► Node D
//!                    └─► Node C
//! ```
//!
//! # Modules
//!
//! - [`mailbox`]: per-node FIFO queue with a blocking wake
//! - [`node`]: node handles, fan-out, relay and the dispatch loop
//! - [`plugin`]: the stage contract and the emitter handed to it
//! - [`callback`]: closures as nodes
//! - [`channel`]: output channel selection and edge direction
//! - [`nodes`]: built-in stages
//! - [`builder`]: registry of node kinds and config-driven graph building
//! - [`snapshot`]: serializable topology views

pub mod builder;
pub mod callback;
pub mod channel;
pub mod id;
pub mod mailbox;
pub mod node;
pub mod nodes;
pub mod plugin;
pub mod snapshot;

pub use builder::{NodeFactory, NodeRegistry, Pipeline, PipelineBuilder};
pub use callback::{Callback, CallbackOutput, IntoNode};
pub use channel::{Channel, Direction};
pub use id::NodeId;
pub use node::{Node, NodeOptions, NodeStats};
pub use plugin::{Emitter, Item, Plugin};
pub use snapshot::{EdgeSnapshot, NodeSnapshot, TopologySnapshot};
