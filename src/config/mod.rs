//! Graph configuration files
//!
//! A graph file declares nodes by `kind` and the edges between them. Kinds are
//! resolved against a [`NodeRegistry`](crate::graph::NodeRegistry) when the
//! graph is built, so this module only deals with the file format.
//!
//! # Format
//!
//! ```toml
//! entry = "clean"
//!
//! [logging]
//! filter = "info,plugin_graph=debug"
//! file = "graph.log"
//!
//! [[nodes]]
//! name = "clean"
//! kind = "trim"
//! threaded = false
//!
//! [[nodes]]
//! name = "out"
//! kind = "print"
//! params = { prefix = "> " }
//!
//! [[edges]]
//! node = "clean"
//! target = "out"
//! direction = "output"
//! ```
//!
//! `threaded` defaults to `true`, `relay` to `false` and `direction` to
//! `"output"`. Directions are kept as text here and validated when the graph
//! is built.

pub mod value;

pub use value::ConfigValue;

use crate::error::{GraphError, Result};
use crate::graph::NodeOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Log filter used when neither the graph file nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info,plugin_graph=debug";

/// Current graph file format version
pub const GRAPH_FILE_VERSION: u32 = 1;

/// A complete graph file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Graph file format version for future compatibility
    #[serde(default = "default_graph_version")]
    pub version: u32,

    /// Node that receives external input. Defaults to the first node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Node declarations, in creation order
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Edge declarations, in wiring order (which fixes channel indices)
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
}

fn default_graph_version() -> u32 {
    GRAPH_FILE_VERSION
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            version: GRAPH_FILE_VERSION,
            entry: None,
            logging: LoggingConfig::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a graph from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GraphError::Config(format!("Failed to parse graph config: {}", e)))
    }

    /// Render the graph as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GraphError::Config(format!("Failed to serialize graph config: {}", e)))
    }

    /// Load a graph file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GraphError::Config(format!("Failed to read graph file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    /// Save the graph file to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GraphError::Config(format!("Failed to create graph directory: {}", e))
            })?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            GraphError::Config(format!("Failed to write graph file {:?}: {}", path, e))
        })
    }

    /// Append a node declaration
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append an edge declaration
    pub fn with_edge(mut self, edge: EdgeConfig) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn find_node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Name of the entry node: the explicit `entry`, else the first node
    pub fn entry_name(&self) -> Option<&str> {
        self.entry
            .as_deref()
            .or_else(|| self.nodes.first().map(|n| n.name.as_str()))
    }
}

/// Logging settings of a graph file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Also write logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// The configured filter, or [`DEFAULT_LOG_FILTER`]
    pub fn filter_or_default(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// One node declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique name within the graph
    pub name: String,

    /// Registry kind used to construct the node
    pub kind: String,

    /// Run on a dedicated dispatch thread
    #[serde(default = "default_true")]
    pub threaded: bool,

    /// Re-emit original inputs after processed results
    #[serde(default)]
    pub relay: bool,

    /// Stage-specific parameters, opaque to the runtime
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ConfigValue>,
}

fn default_true() -> bool {
    true
}

impl NodeConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            threaded: true,
            relay: false,
            params: BTreeMap::new(),
        }
    }

    /// Run on the caller's thread
    pub fn inline(mut self) -> Self {
        self.threaded = false;
        self
    }

    pub fn relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&ConfigValue> {
        self.params.get(key)
    }

    /// Runtime options for the node this declaration describes
    pub fn options(&self) -> NodeOptions {
        NodeOptions::new()
            .named(self.name.clone())
            .relay(self.relay)
            .threaded(self.threaded)
    }
}

/// One edge declaration: `node.connect(target, direction)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Node the edge is added on
    pub node: String,

    /// Node on the other end
    pub target: String,

    /// `"output"` (node -> target) or `"input"` (target -> node)
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "output".to_string()
}

impl EdgeConfig {
    /// `node -> target`
    pub fn output(node: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            target: target.into(),
            direction: default_direction(),
        }
    }

    /// `target -> node`
    pub fn input(node: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            target: target.into(),
            direction: "input".to_string(),
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
entry = "clean"

[logging]
filter = "warn"

[[nodes]]
name = "clean"
kind = "trim"
threaded = false

[[nodes]]
name = "out"
kind = "print"
relay = true
params = { prefix = "> ", width = 80 }

[[edges]]
node = "clean"
target = "out"

[[edges]]
node = "out"
target = "clean"
direction = "input"
"#;

    #[test]
    fn test_graph_config_default() {
        let config = GraphConfig::default();
        assert_eq!(config.version, GRAPH_FILE_VERSION);
        assert!(config.nodes.is_empty());
        assert!(config.edges.is_empty());
        assert!(config.entry_name().is_none());
        assert_eq!(config.logging.filter_or_default(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_parse_sample() {
        let config = GraphConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.entry_name(), Some("clean"));
        assert_eq!(config.logging.filter_or_default(), "warn");
        assert_eq!(config.nodes.len(), 2);

        let clean = config.find_node("clean").unwrap();
        assert!(!clean.threaded);
        assert!(!clean.relay);

        let out = config.find_node("out").unwrap();
        assert!(out.threaded);
        assert!(out.relay);
        assert_eq!(out.param("prefix").and_then(|v| v.as_str()), Some("> "));
        assert_eq!(out.param("width").and_then(|v| v.as_int()), Some(80));

        assert_eq!(config.edges[0].direction, "output");
        assert_eq!(config.edges[1].direction, "input");
    }

    #[test]
    fn test_entry_defaults_to_first_node() {
        let config = GraphConfig::new()
            .with_node(NodeConfig::new("a", "trim"))
            .with_node(NodeConfig::new("b", "print"));
        assert_eq!(config.entry_name(), Some("a"));
    }

    #[test]
    fn test_node_config_options() {
        let node = NodeConfig::new("n", "k").inline().relay(true);
        let opts = node.options();
        assert_eq!(opts.name.as_deref(), Some("n"));
        assert!(opts.relay);
        assert!(!opts.threaded);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GraphConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        let parsed = GraphConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = GraphConfig::from_toml_str("[[nodes]]\nname = 3").unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.toml");

        let config = GraphConfig::new()
            .with_node(NodeConfig::new("a", "trim").with_param("limit", 3i64))
            .with_edge(EdgeConfig::output("a", "a"));
        config.save(&path).unwrap();

        let loaded = GraphConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = GraphConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read graph file"));
    }
}
