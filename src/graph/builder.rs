//! Building graphs from configuration.
//!
//! A [`NodeRegistry`] maps the `kind` strings of a graph file to factories.
//! [`PipelineBuilder`] checks a whole [`GraphConfig`] against the registry,
//! then creates the nodes and wires the edges, producing a [`Pipeline`] that
//! owns named handles to every node.

use crate::config::{GraphConfig, NodeConfig};
use crate::error::{GraphError, Result, ResultExt};
use crate::graph::channel::Direction;
use crate::graph::node::Node;
use crate::graph::plugin::Item;
use crate::graph::snapshot::TopologySnapshot;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Creates a node from its declaration.
pub type NodeFactory<T> = Box<dyn Fn(&NodeConfig) -> Result<Node<T>> + Send + Sync>;

/// Node kinds known to a builder.
pub struct NodeRegistry<T: Item> {
    factories: BTreeMap<String, NodeFactory<T>>,
}

impl<T: Item> Default for NodeRegistry<T> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<T: Item> NodeRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `kind`, replacing any previous factory.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&NodeConfig) -> Result<Node<T>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), Box::new(factory)).is_some() {
            tracing::warn!("Node kind '{}' registered twice, keeping the latest", kind);
        }
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create the node `config` declares.
    pub fn create(&self, config: &NodeConfig) -> Result<Node<T>> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            GraphError::InvalidArgument(format!(
                "unknown node kind '{}' for node '{}'",
                config.kind, config.name
            ))
        })?;
        factory(config).with_context(|| format!("Failed to create node '{}'", config.name))
    }
}

impl<T: Item> fmt::Debug for NodeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A resolved edge: indices into the node list.
struct Wire {
    node: usize,
    target: usize,
    direction: Direction,
}

/// Builds [`Pipeline`]s from graph configs.
pub struct PipelineBuilder<'a, T: Item> {
    registry: &'a NodeRegistry<T>,
}

impl<'a, T: Item> PipelineBuilder<'a, T> {
    pub fn new(registry: &'a NodeRegistry<T>) -> Self {
        Self { registry }
    }

    /// Validate `config`, then create and wire every node.
    ///
    /// Nothing is created unless the whole config checks out.
    pub fn build(&self, config: &GraphConfig) -> Result<Pipeline<T>> {
        let (names, wires, entry) = self.validate(config)?;

        // ── Nodes ──

        let mut nodes = Vec::with_capacity(config.nodes.len());
        for node_config in &config.nodes {
            nodes.push(self.registry.create(node_config)?);
        }

        // ── Edges ──

        for wire in &wires {
            nodes[wire.node].connect(&nodes[wire.target], wire.direction)?;
        }

        tracing::info!(
            "Built pipeline: {} nodes, {} edges, entry '{}'",
            nodes.len(),
            wires.len(),
            config.nodes[entry].name
        );

        Ok(Pipeline {
            nodes,
            names,
            entry,
        })
    }

    fn validate(&self, config: &GraphConfig) -> Result<(HashMap<String, usize>, Vec<Wire>, usize)> {
        if config.nodes.is_empty() {
            return Err(GraphError::Config("graph declares no nodes".to_string()));
        }

        let mut names = HashMap::with_capacity(config.nodes.len());
        for (index, node) in config.nodes.iter().enumerate() {
            if names.insert(node.name.clone(), index).is_some() {
                return Err(GraphError::Config(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
            if !self.registry.contains(&node.kind) {
                return Err(GraphError::InvalidArgument(format!(
                    "unknown node kind '{}' for node '{}'",
                    node.kind, node.name
                )));
            }
        }

        let lookup = |name: &str, role: &str| {
            names.get(name).copied().ok_or_else(|| {
                GraphError::Config(format!("edge {} '{}' is not a declared node", role, name))
            })
        };

        let mut wires = Vec::with_capacity(config.edges.len());
        for edge in &config.edges {
            let direction = edge
                .direction
                .parse::<Direction>()
                .with_context(|| format!("edge '{}' -> '{}'", edge.node, edge.target))?;
            wires.push(Wire {
                node: lookup(&edge.node, "node")?,
                target: lookup(&edge.target, "target")?,
                direction,
            });
        }

        let entry = match config.entry_name() {
            Some(name) => lookup(name, "entry")
                .map_err(|_| GraphError::Config(format!("entry '{}' is not a declared node", name)))?,
            None => 0,
        };

        Ok((names, wires, entry))
    }
}

/// A built graph with named node handles.
pub struct Pipeline<T: Item> {
    /// Nodes in declaration order.
    nodes: Vec<Node<T>>,
    names: HashMap<String, usize>,
    entry: usize,
}

impl<T: Item> Pipeline<T> {
    /// Look up a node by its declared name.
    pub fn get(&self, name: &str) -> Option<&Node<T>> {
        self.names.get(name).map(|&index| &self.nodes[index])
    }

    /// The node external input is fed to.
    pub fn entry(&self) -> &Node<T> {
        &self.nodes[self.entry]
    }

    /// Feed an item to the entry node.
    pub fn input(&self, item: T) -> Result<()> {
        self.entry().input(item)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topology of every node in the pipeline.
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot::capture(&self.nodes)
    }

    /// Drop the pipeline's handles and wait for every dispatch thread.
    ///
    /// Each loop drains its mailbox before exiting, and its exit releases its
    /// downstream handles, so closing cascades from the entry to the sinks.
    /// Blocks forever on a cyclic graph or while node handles are still held
    /// outside the pipeline.
    pub fn close(self) {
        let Pipeline { nodes, .. } = self;

        let workers: Vec<_> = nodes
            .iter()
            .filter_map(|node| {
                node.take_worker()
                    .map(|handle| (node.id(), node.name().to_string(), handle))
            })
            .collect();
        drop(nodes);

        let count = workers.len();
        for (id, name, handle) in workers {
            if handle.join().is_err() {
                tracing::warn!("Node {} '{}' dispatch thread panicked", id, name);
            }
        }

        tracing::info!("Pipeline closed ({} dispatch threads joined)", count);
    }
}

impl<T: Item> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("nodes", &self.nodes)
            .field("entry", &self.entry().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdgeConfig;
    use crate::graph::callback::Callback;
    use crate::graph::nodes::{register_text_nodes, ChannelSink};
    use crossbeam_channel::{unbounded, Receiver};

    /// Text registry plus a `collect` kind feeding the returned receiver.
    fn registry() -> (NodeRegistry<String>, Receiver<String>) {
        let mut registry = NodeRegistry::new();
        register_text_nodes(&mut registry);
        let (tx, rx) = unbounded();
        registry.register("collect", move |cfg| {
            Node::new(ChannelSink::with_sender(tx.clone()), cfg.options())
        });
        (registry, rx)
    }

    fn chain(threaded: bool) -> GraphConfig {
        let node = |name: &str, kind: &str| {
            let cfg = NodeConfig::new(name, kind);
            if threaded {
                cfg
            } else {
                cfg.inline()
            }
        };
        GraphConfig::new()
            .with_node(node("clean", "trim"))
            .with_node(node("upper", "uppercase"))
            .with_node(node("sink", "collect"))
            .with_edge(EdgeConfig::output("clean", "upper"))
            .with_edge(EdgeConfig::input("sink", "upper"))
    }

    #[test]
    fn test_registry_kinds_sorted() {
        let (registry, _rx) = registry();
        let kinds: Vec<_> = registry.kinds().collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
        assert!(registry.contains("collect"));
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_registry_unknown_kind() {
        let registry = NodeRegistry::<String>::new();
        let err = registry.create(&NodeConfig::new("x", "nope")).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn test_registry_factory_error_has_context() {
        let mut registry = NodeRegistry::<String>::new();
        registry.register("broken", |_| Err(GraphError::process("no model")));
        let err = registry.create(&NodeConfig::new("llm", "broken")).unwrap_err();
        assert!(err.to_string().contains("Failed to create node 'llm'"));
    }

    #[test]
    fn test_build_inline_chain() {
        let (registry, rx) = registry();
        let pipeline = PipelineBuilder::new(&registry).build(&chain(false)).unwrap();

        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.entry().name(), "clean");

        pipeline.input("  hello  ".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "HELLO");
    }

    #[test]
    fn test_build_uses_explicit_entry() {
        let (registry, rx) = registry();
        let mut config = chain(false);
        config.entry = Some("upper".to_string());

        let pipeline = PipelineBuilder::new(&registry).build(&config).unwrap();
        pipeline.input("  padded ".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "  PADDED ");
    }

    #[test]
    fn test_build_rejects_empty_graph() {
        let (registry, _rx) = registry();
        let err = PipelineBuilder::new(&registry)
            .build(&GraphConfig::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_names() {
        let (registry, _rx) = registry();
        let config = GraphConfig::new()
            .with_node(NodeConfig::new("a", "trim").inline())
            .with_node(NodeConfig::new("a", "print").inline());
        let err = PipelineBuilder::new(&registry).build(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate node name 'a'"));
    }

    #[test]
    fn test_build_rejects_unknown_endpoint() {
        let (registry, _rx) = registry();
        let config = chain(false).with_edge(EdgeConfig::output("clean", "ghost"));
        let err = PipelineBuilder::new(&registry).build(&config).unwrap_err();
        assert!(err.to_string().contains("'ghost'"));
    }

    #[test]
    fn test_build_rejects_bad_direction_before_wiring() {
        let mut registry = NodeRegistry::<String>::new();
        let (tx, rx) = unbounded();
        registry.register("counted", move |cfg| {
            let _ = tx.send(());
            Node::new(Callback::new(|s: String| Some(s)), cfg.options())
        });

        let mut edge = EdgeConfig::output("a", "b");
        edge.direction = "sideways".to_string();
        let config = GraphConfig::new()
            .with_node(NodeConfig::new("a", "counted").inline())
            .with_node(NodeConfig::new("b", "counted").inline())
            .with_edge(edge);

        let err = PipelineBuilder::new(&registry).build(&config).unwrap_err();
        assert!(err.to_string().contains("sideways"));
        assert!(rx.try_recv().is_err(), "no node may be created");
    }

    #[test]
    fn test_build_rejects_unknown_entry() {
        let (registry, _rx) = registry();
        let mut config = chain(false);
        config.entry = Some("missing".to_string());
        let err = PipelineBuilder::new(&registry).build(&config).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_close_drains_threaded_chain() {
        let (registry, rx) = registry();
        let pipeline = PipelineBuilder::new(&registry).build(&chain(true)).unwrap();

        for i in 0..100 {
            pipeline.input(format!(" item{} ", i)).unwrap();
        }
        pipeline.close();

        let received: Vec<_> = rx.try_iter().collect();
        let expected: Vec<_> = (0..100).map(|i| format!("ITEM{}", i)).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_snapshot_covers_all_nodes() {
        let (registry, _rx) = registry();
        let pipeline = PipelineBuilder::new(&registry).build(&chain(false)).unwrap();
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.edges.len(), 2);
        assert_eq!(snapshot.nodes[0].name, "clean");
    }
}
