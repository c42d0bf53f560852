//! Per-node inbound queue.
//!
//! A mailbox is an unbounded FIFO with many producers and exactly one
//! consumer, the owning node's dispatch loop. Blocking on the receiver doubles
//! as the node's wake signal: it stays ready for as long as anything is queued,
//! so an item posted while the consumer is mid-drain is either picked up by
//! that drain or wakes the next wait.
//!
//! There is no capacity limit and posting never blocks. A slow consumer grows
//! its queue instead of pushing back on producers.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Create a connected sender/mailbox pair.
pub fn mailbox<T>() -> (MailboxSender<T>, Mailbox<T>) {
    let (tx, rx) = unbounded();
    (MailboxSender { tx }, Mailbox { rx })
}

/// Producer side of a mailbox. Cloned freely; owned by node handles.
pub struct MailboxSender<T> {
    tx: Sender<T>,
}

impl<T> MailboxSender<T> {
    /// Enqueue an item and wake the consumer.
    ///
    /// Hands the item back if the consumer has gone away.
    pub fn post(&self, item: T) -> Result<(), T> {
        self.tx.send(item).map_err(|e| e.into_inner())
    }

    /// Number of items waiting to be drained.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer side of a mailbox, owned by a dispatch loop.
pub struct Mailbox<T> {
    rx: Receiver<T>,
}

impl<T> Mailbox<T> {
    /// Block until at least one item is queued, then return a draining iterator.
    ///
    /// Returns `None` once every sender is dropped and the queue is empty.
    pub fn wait(&self) -> Option<Drain<'_, T>> {
        let first = self.rx.recv().ok()?;
        Some(Drain {
            first: Some(first),
            rx: &self.rx,
        })
    }

    /// Number of items waiting to be drained.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Yields queued items in FIFO order until the mailbox is momentarily empty.
pub struct Drain<'a, T> {
    first: Option<T>,
    rx: &'a Receiver<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.first.take().or_else(|| self.rx.try_recv().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_drain_is_fifo() {
        let (tx, mb) = mailbox();
        for i in 0..5 {
            tx.post(i).unwrap();
        }
        assert_eq!(tx.pending(), 5);

        let drained: Vec<_> = mb.wait().unwrap().collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(mb.is_empty());
    }

    #[test]
    fn test_items_posted_during_drain_are_seen() {
        let (tx, mb) = mailbox();
        tx.post(1).unwrap();

        let mut drain = mb.wait().unwrap();
        assert_eq!(drain.next(), Some(1));
        tx.post(2).unwrap();
        assert_eq!(drain.next(), Some(2));
        assert_eq!(drain.next(), None);
    }

    #[test]
    fn test_wait_wakes_on_post() {
        let (tx, mb) = mailbox();
        let handle = thread::spawn(move || mb.wait().map(|d| d.collect::<Vec<_>>()));

        thread::sleep(Duration::from_millis(20));
        tx.post("hello").unwrap();

        assert_eq!(handle.join().unwrap(), Some(vec!["hello"]));
    }

    #[test]
    fn test_wait_returns_none_when_senders_dropped() {
        let (tx, mb) = mailbox::<u32>();
        tx.post(9).unwrap();
        drop(tx);

        // Queued items are still delivered before the close is observed
        assert_eq!(mb.wait().unwrap().collect::<Vec<_>>(), vec![9]);
        assert!(mb.wait().is_none());
    }

    #[test]
    fn test_post_after_consumer_dropped_returns_item() {
        let (tx, mb) = mailbox();
        drop(mb);
        assert_eq!(tx.post(3), Err(3));
    }
}
