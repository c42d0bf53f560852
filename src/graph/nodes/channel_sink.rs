//! ChannelSink: hands items across a thread boundary via crossbeam channel.
//!
//! The receiving half is returned to whoever builds the graph, so results can
//! be consumed on a thread that is not part of it (a UI loop, a test, the CLI
//! main thread).

use crate::error::{GraphError, Result};
use crate::graph::plugin::{Emitter, Item, Plugin};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Terminal node that forwards every item into a channel.
pub struct ChannelSink<T> {
    tx: Sender<T>,
}

impl<T> ChannelSink<T> {
    /// Create a sink and the receiver its items arrive on.
    pub fn channel() -> (Self, Receiver<T>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Sink into an existing channel.
    pub fn with_sender(tx: Sender<T>) -> Self {
        Self { tx }
    }
}

impl<T: Item> Plugin<T> for ChannelSink<T> {
    fn name(&self) -> &str {
        "ChannelSink"
    }

    fn process(&mut self, item: T, _out: &Emitter<'_, T>) -> Result<Option<T>> {
        self.tx.send(item).map_err(|_| GraphError::ChannelSend)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{Node, NodeOptions};

    #[test]
    fn test_sink_forwards_to_receiver() {
        let (sink, rx) = ChannelSink::channel();
        let node = Node::new(sink, NodeOptions::new().inline()).unwrap();

        node.input("a").unwrap();
        node.input("b").unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_sink_reports_dropped_receiver() {
        let (sink, rx) = ChannelSink::channel();
        let node = Node::new(sink, NodeOptions::new().inline()).unwrap();
        drop(rx);

        assert!(matches!(node.input(1u8), Err(GraphError::ChannelSend)));
    }
}
