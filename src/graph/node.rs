//! Node handles and the dispatch loop.
//!
//! A [`Node`] is a cheap, cloneable handle to one vertex of the graph. The
//! vertex hosts a [`Plugin`] and an ordered list of output edges. Two
//! execution modes are fixed at construction:
//!
//! - **Threaded** (default): the node owns a mailbox and a dedicated dispatch
//!   thread. `input` enqueues and returns immediately; the thread drains the
//!   mailbox in FIFO order.
//! - **Inline**: no mailbox, no thread. `input` runs the plugin on the caller's
//!   thread and returns once the item and all synchronous downstream work are
//!   done.
//!
//! For every item the node emits the plugin's result to all outputs first and
//! then, if `relay` is set, the untouched original.
//!
//! ```text
//!            ┌──────────── Node ────────────┐
//! input() ──►│ mailbox ─► process() ─► output() ──► outputs[0].input()
//!            │                        └──────────► outputs[1].input()
//!            └──────────────────────────────┘
//! ```
//!
//! The graph itself is not an object: it is whatever the output lists of the
//! nodes reference. Cyclic wiring is not detected on the delivery path.

use crate::error::{GraphError, Result};
use crate::graph::callback::IntoNode;
use crate::graph::channel::{Channel, Direction};
use crate::graph::id::NodeId;
use crate::graph::mailbox::{mailbox, Mailbox, MailboxSender};
use crate::graph::plugin::{Emitter, Item, Plugin};
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

/// Construction-time settings of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOptions {
    /// Display name. Defaults to the plugin's name.
    pub name: Option<String>,
    /// Re-emit each original input after the processed result.
    pub relay: bool,
    /// Run on a dedicated dispatch thread instead of the caller's.
    pub threaded: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            name: None,
            relay: false,
            threaded: true,
        }
    }
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    pub fn threaded(mut self, threaded: bool) -> Self {
        self.threaded = threaded;
        self
    }

    /// Shorthand for `threaded(false)`.
    pub fn inline(self) -> Self {
        self.threaded(false)
    }
}

/// Point-in-time counters of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    /// Items handed to `process`.
    pub processed: u64,
    /// Deliveries made to downstream nodes (one per target per value).
    pub emitted: u64,
    /// Items whose processing or delivery returned an error.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    emitted: AtomicU64,
    failed: AtomicU64,
}

/// State shared between a node's handles and its dispatch thread.
pub(crate) struct NodeCore<T: Item> {
    id: NodeId,
    name: String,
    plugin_type: TypeId,
    relay: bool,
    threaded: bool,
    outputs: RwLock<Vec<Node<T>>>,
    counters: Counters,
}

impl<T: Item> NodeCore<T> {
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn output_count(&self) -> usize {
        self.outputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn outputs_snapshot(&self) -> Vec<Node<T>> {
        self.outputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push_output(&self, target: Node<T>) {
        self.outputs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target);
    }

    /// Deliver `value` to the selected outputs. `None` is a no-op.
    pub(crate) fn output(&self, value: Option<T>, channel: Channel) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };

        match channel {
            Channel::Index(index) => {
                let target = {
                    let outputs = self.outputs.read().unwrap_or_else(PoisonError::into_inner);
                    outputs
                        .get(index)
                        .cloned()
                        .ok_or(GraphError::ChannelOutOfRange {
                            node: self.id,
                            channel: index,
                            outputs: outputs.len(),
                        })?
                };
                self.deliver(&target, value)
            }
            Channel::All => {
                // Deliver to the edges present now; the lock is not held while
                // downstream inline nodes run. A failed output does not stop
                // delivery to the ones after it; the first error is returned.
                let targets = self.outputs_snapshot();
                let mut first_error = None;
                if let Some((last, rest)) = targets.split_last() {
                    for target in rest {
                        if let Err(e) = self.deliver(target, value.clone()) {
                            first_error.get_or_insert(e);
                        }
                    }
                    if let Err(e) = self.deliver(last, value) {
                        first_error.get_or_insert(e);
                    }
                }
                first_error.map_or(Ok(()), Err)
            }
        }
    }

    /// Hand `value` to one output, counting it as emitted only if accepted.
    fn deliver(&self, target: &Node<T>, value: T) -> Result<()> {
        match target.input(value) {
            Ok(()) => {
                self.counters.emitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "Node {} '{}' could not deliver to {} '{}': {}",
                    self.id,
                    self.name,
                    target.id(),
                    target.name(),
                    e
                );
                Err(e)
            }
        }
    }

    /// process -> output -> relay for a single item.
    fn dispatch(&self, plugin: &mut dyn Plugin<T>, item: T) -> Result<()> {
        let original = self.relay.then(|| item.clone());

        tracing::trace!("Node {} '{}' processing item", self.id, self.name);
        self.counters.processed.fetch_add(1, Ordering::Relaxed);

        let emitter = Emitter::new(self);
        let result = plugin.process(item, &emitter)?;
        let delivered = self.output(result, Channel::All);

        // The original is relayed even if some outputs rejected the result
        let relayed = match original {
            Some(original) => self.output(Some(original), Channel::All),
            None => Ok(()),
        };
        delivered.and(relayed)
    }

    fn record_failure(&self) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn stats(&self) -> NodeStats {
        NodeStats {
            processed: self.counters.processed.load(Ordering::Relaxed),
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// How items enter the node.
enum Entry<T: Item> {
    Threaded(MailboxSender<T>),
    Inline(Mutex<Box<dyn Plugin<T>>>),
}

struct NodeInner<T: Item> {
    core: Arc<NodeCore<T>>,
    entry: Entry<T>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a graph node. Clones refer to the same node.
pub struct Node<T: Item> {
    inner: Arc<NodeInner<T>>,
}

impl<T: Item> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Item> Node<T> {
    /// Create a node hosting `plugin`.
    ///
    /// A threaded node's dispatch thread is started before this returns.
    pub fn new<P: Plugin<T>>(plugin: P, options: NodeOptions) -> Result<Self> {
        let name = options
            .name
            .unwrap_or_else(|| plugin.name().to_string());
        let core = Arc::new(NodeCore {
            id: NodeId::next(),
            name,
            plugin_type: TypeId::of::<P>(),
            relay: options.relay,
            threaded: options.threaded,
            outputs: RwLock::new(Vec::new()),
            counters: Counters::default(),
        });

        let (entry, worker) = if options.threaded {
            let (tx, mailbox) = mailbox();
            let loop_core = Arc::clone(&core);
            let mut plugin = plugin;
            let handle = thread::Builder::new()
                .name(format!("node-{}", core.name))
                .spawn(move || dispatch_loop(&loop_core, &mailbox, &mut plugin))
                .map_err(GraphError::Spawn)?;
            (Entry::Threaded(tx), Some(handle))
        } else {
            (Entry::Inline(Mutex::new(Box::new(plugin))), None)
        };

        tracing::debug!(
            "Created node {} '{}' (threaded={}, relay={})",
            core.id,
            core.name,
            core.threaded,
            core.relay
        );

        Ok(Self {
            inner: Arc::new(NodeInner {
                core,
                entry,
                worker: Mutex::new(worker),
            }),
        })
    }

    /// Create a node with default options (threaded, no relay).
    pub fn spawn<P: Plugin<T>>(plugin: P) -> Result<Self> {
        Self::new(plugin, NodeOptions::default())
    }

    // ── Identity ──

    pub fn id(&self) -> NodeId {
        self.inner.core.id
    }

    pub fn name(&self) -> &str {
        &self.inner.core.name
    }

    pub fn is_threaded(&self) -> bool {
        self.inner.core.threaded
    }

    pub fn is_relay(&self) -> bool {
        self.inner.core.relay
    }

    /// Whether this node hosts a plugin of type `P`.
    pub fn is<P: 'static>(&self) -> bool {
        self.inner.core.plugin_type == TypeId::of::<P>()
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Graph building ──

    /// Wire this node to `other`.
    ///
    /// `Direction::Output` adds `this -> other`; `Direction::Input` adds
    /// `other -> this`. Closures are wrapped in a [`Callback`] node first.
    /// Returns `self` so calls can be chained.
    ///
    /// [`Callback`]: crate::graph::callback::Callback
    pub fn connect<N: IntoNode<T>>(&self, other: N, direction: Direction) -> Result<&Self> {
        let other = other.into_node()?;
        match direction {
            Direction::Output => {
                tracing::debug!("Connecting {} -> {}", self.id(), other.id());
                self.inner.core.push_output(other);
            }
            Direction::Input => {
                tracing::debug!("Connecting {} -> {}", other.id(), self.id());
                other.inner.core.push_output(self.clone());
            }
        }
        Ok(self)
    }

    /// Add `other` as the next output channel of this node.
    pub fn add<N: IntoNode<T>>(&self, other: N) -> Result<&Self> {
        self.connect(other, Direction::Output)
    }

    /// Current output edges, in channel order.
    pub fn outputs(&self) -> Vec<Node<T>> {
        self.inner.core.outputs_snapshot()
    }

    pub fn output_count(&self) -> usize {
        self.inner.core.output_count()
    }

    // ── Graph search ──

    /// Depth-first search of this node and everything downstream of it for a
    /// node hosting a plugin of type `P`.
    pub fn find<P: 'static>(&self) -> Option<Node<T>> {
        let wanted = TypeId::of::<P>();
        self.find_by(|node| node.inner.core.plugin_type == wanted)
    }

    /// Depth-first search of this node and everything downstream of it.
    ///
    /// Checks this node first, then each output in channel order, returning
    /// the first match. Upstream nodes are never visited. Each node is
    /// visited at most once, so cyclic graphs terminate.
    pub fn find_by(&self, predicate: impl Fn(&Node<T>) -> bool) -> Option<Node<T>> {
        let mut visited = HashSet::new();
        let mut stack = vec![self.clone()];

        while let Some(node) = stack.pop() {
            if !visited.insert(node.id()) {
                continue;
            }
            if predicate(&node) {
                return Some(node);
            }
            // Reverse so channel 0 is explored first
            stack.extend(node.outputs().into_iter().rev());
        }
        None
    }

    /// Find a downstream node by name.
    pub fn find_named(&self, name: &str) -> Option<Node<T>> {
        self.find_by(|node| node.name() == name)
    }

    // ── Data flow ──

    /// Feed an item to this node.
    ///
    /// Threaded nodes enqueue and return immediately. Inline nodes process the
    /// item, and everything it synchronously triggers downstream, before
    /// returning.
    pub fn input(&self, item: T) -> Result<()> {
        match &self.inner.entry {
            Entry::Threaded(tx) => tx.post(item).map_err(|_| GraphError::Disconnected {
                node: self.id(),
            }),
            Entry::Inline(plugin) => {
                let mut plugin = plugin.lock().unwrap_or_else(PoisonError::into_inner);
                let result = self.inner.core.dispatch(&mut **plugin, item);
                if result.is_err() {
                    self.inner.core.record_failure();
                }
                result
            }
        }
    }

    /// Feed an item on an input channel.
    ///
    /// Nodes have a single channel-agnostic mailbox, so `channel` is ignored.
    pub fn input_on(&self, item: T, channel: Channel) -> Result<()> {
        let _ = channel;
        self.input(item)
    }

    /// Send `value` to this node's outputs. `None` is a no-op.
    pub fn output(&self, value: impl Into<Option<T>>, channel: Channel) -> Result<()> {
        self.inner.core.output(value.into(), channel)
    }

    // ── Introspection ──

    /// Items queued but not yet processed. Always 0 for inline nodes.
    pub fn pending(&self) -> usize {
        match &self.inner.entry {
            Entry::Threaded(tx) => tx.pending(),
            Entry::Inline(_) => 0,
        }
    }

    pub fn stats(&self) -> NodeStats {
        self.inner.core.stats()
    }

    /// Take ownership of the dispatch thread handle, if not already taken.
    pub(crate) fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T: Item> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: Item> Eq for Node<T> {}

impl<T: Item> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("threaded", &self.is_threaded())
            .field("relay", &self.is_relay())
            .field("outputs", &self.output_count())
            .finish()
    }
}

/// Body of a threaded node's dispatch thread.
///
/// Runs until every handle to the node is dropped and the mailbox is empty.
/// Non-fatal errors are logged and the loop moves on to the next item; a fatal
/// error ends the loop and closes the mailbox.
fn dispatch_loop<T: Item, P: Plugin<T>>(core: &NodeCore<T>, mailbox: &Mailbox<T>, plugin: &mut P) {
    tracing::debug!("Node {} '{}' dispatch loop started", core.id, core.name);

    while let Some(batch) = mailbox.wait() {
        for item in batch {
            if let Err(e) = core.dispatch(&mut *plugin, item) {
                core.record_failure();
                tracing::error!("Node {} '{}' failed to dispatch item: {}", core.id, core.name, e);
                if e.is_fatal() {
                    tracing::error!(
                        "Node {} '{}' stopping after fatal error ({} items dropped)",
                        core.id,
                        core.name,
                        mailbox.len()
                    );
                    return;
                }
            }
        }
    }

    tracing::debug!("Node {} '{}' dispatch loop exiting", core.id, core.name);
}
