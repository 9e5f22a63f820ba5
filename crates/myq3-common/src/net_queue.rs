// net_queue.rs — hand-off queue between the network/demo reader and the frame loop
//
// The reader thread decodes inbound messages and enqueues them; the frame
// loop drains the queue between frames, so the history rings keep a single
// writer.

use crossbeam::channel::{bounded, Receiver, SendError, Sender};

/// Default queue capacity - handles typical burst traffic without excessive memory use.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Maximum queue capacity - absolute limit to prevent memory exhaustion.
pub const MAX_QUEUE_CAPACITY: usize = 4096;

/// A decoded message with the time it was received (host wall-clock msec).
#[derive(Debug, Clone)]
pub struct Queued<T> {
    pub message: T,
    pub timestamp: i32,
}

/// Thread-safe message queue between the reader and the frame loop.
///
/// Uses a bounded crossbeam channel for backpressure control.
pub struct MessageQueue<T> {
    sender: Sender<Queued<T>>,
    receiver: Receiver<Queued<T>>,
}

impl<T> MessageQueue<T> {
    /// Create a new bounded queue. `capacity` is clamped to `MAX_QUEUE_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.clamp(1, MAX_QUEUE_CAPACITY));
        Self { sender, receiver }
    }

    /// Get a clone of the sender handle (for the reader thread).
    pub fn sender(&self) -> MessageQueueSender<T> {
        MessageQueueSender {
            sender: self.sender.clone(),
        }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Option<Queued<T>> {
        self.receiver.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Sender handle for the queue (used by the reader thread).
pub struct MessageQueueSender<T> {
    sender: Sender<Queued<T>>,
}

impl<T> Clone for MessageQueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> MessageQueueSender<T> {
    /// Send a message, waiting for room if the frame loop is behind.
    /// Reliable traffic must go through here; it can't be dropped.
    ///
    /// Returns `false` if the frame loop side has gone away.
    pub fn send(&self, message: T, timestamp: i32) -> bool {
        match self.sender.send(Queued { message, timestamp }) {
            Ok(()) => true,
            Err(SendError(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received<T>(queue: &MessageQueue<T>) -> Vec<T> {
        std::iter::from_fn(|| queue.try_recv()).map(|q| q.message).collect()
    }

    #[test]
    fn test_queue_basic_operations() {
        let queue = MessageQueue::new(10);
        let sender = queue.sender();

        assert!(queue.is_empty());
        assert!(sender.send(1u32, 100));
        assert_eq!(queue.len(), 1);

        let msg = queue.try_recv().unwrap();
        assert_eq!(msg.message, 1);
        assert_eq!(msg.timestamp, 100);
        assert!(queue.is_empty());
        assert!(queue.try_recv().is_none());
    }

    #[test]
    fn test_queue_preserves_arrival_order() {
        let queue = MessageQueue::new(2);
        let sender = queue.sender();

        assert!(sender.send("a", 0));
        assert!(sender.send("b", 5));
        assert_eq!(queue.len(), 2);
        assert_eq!(received(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_send_from_reader_thread() {
        let queue = MessageQueue::new(4);
        let sender = queue.sender();
        let reader = std::thread::spawn(move || {
            for i in 0..3 {
                assert!(sender.send(i, i));
            }
        });
        reader.join().unwrap();
        assert_eq!(received(&queue), vec![0, 1, 2]);
    }

    #[test]
    fn test_send_fails_after_queue_dropped() {
        let queue = MessageQueue::new(4);
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.send(1u8, 0));
    }
}
