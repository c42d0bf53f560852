//! Error handling for the plugin graph runtime
//!
//! This module defines the crate-wide error type and a Result alias used by
//! nodes, plugins, the graph builder and the configuration loader.

use crate::graph::id::NodeId;
use thiserror::Error;

/// Main error type for graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// A plugin was fed an item without overriding `process`
    #[error("plugin {plugin} has not implemented process()")]
    NotImplemented { plugin: String },

    /// A caller supplied a value the graph cannot use
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `output` targeted a channel index beyond the node's output list
    #[error("Node {node} has no output channel {channel} ({outputs} outputs connected)")]
    ChannelOutOfRange {
        node: NodeId,
        channel: usize,
        outputs: usize,
    },

    /// The node's dispatch thread is gone and its mailbox no longer accepts items
    #[error("Node {node} is disconnected")]
    Disconnected { node: NodeId },

    /// Stage-specific processing failure
    #[error("Process error: {0}")]
    Process(String),

    /// A sink could not hand an item across its channel
    #[error("Channel send error")]
    ChannelSend,

    /// Errors related to graph configuration loading/saving/building
    #[error("Configuration error: {0}")]
    Config(String),

    /// The OS refused to start a dispatch thread
    #[error("Failed to spawn dispatch thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<GraphError>,
    },
}

impl GraphError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        GraphError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a processing error from any displayable message
    pub fn process(message: impl std::fmt::Display) -> Self {
        GraphError::Process(message.to_string())
    }

    /// Whether this error must stop the dispatch loop that hit it.
    ///
    /// Only programming errors are fatal; everything else is logged and the
    /// loop moves on to the next queued item.
    pub fn is_fatal(&self) -> bool {
        match self {
            GraphError::NotImplemented { .. } => true,
            GraphError::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Result type alias for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::InvalidArgument("mode should be 'input' or 'output'".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid argument: mode should be 'input' or 'output'"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = GraphError::Config("missing nodes".to_string());
        let with_ctx = err.with_context("Failed to build graph");
        assert!(with_ctx.to_string().contains("Failed to build graph"));
        assert!(with_ctx.to_string().contains("missing nodes"));
    }

    #[test]
    fn test_channel_out_of_range_display() {
        let err = GraphError::ChannelOutOfRange {
            node: NodeId(7),
            channel: 3,
            outputs: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("NodeId(7)"));
        assert!(msg.contains("channel 3"));
        assert!(msg.contains("2 outputs"));
    }

    #[test]
    fn test_fatal_classification() {
        let fatal = GraphError::NotImplemented {
            plugin: "Dummy".to_string(),
        };
        assert!(fatal.is_fatal());
        assert!(fatal.with_context("dispatch").is_fatal());
        assert!(!GraphError::process("boom").is_fatal());
        assert!(!GraphError::ChannelSend.is_fatal());
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(GraphError::ChannelSend);
        let err = res.context("sink").unwrap_err();
        assert_eq!(err.to_string(), "sink: Channel send error");
    }
}
