//! Fixed-capacity blocking queue with an explicit open/close lifecycle.
//!
//! Every hand-off between pipeline stages goes through a [`BoundedQueue`]:
//! chunk descriptors into the reader pool, completed buffers into the
//! writer pool. Capacity is fixed at construction so a slow consumer
//! applies backpressure to its producer instead of letting memory grow.
//!
//! # Lifecycle
//!
//! A queue starts open. The producer closes it exactly once after pushing
//! the final item; consumers then drain whatever remains and get `None`.
//! Close is idempotent and may also be called from the consuming side,
//! which wakes producers blocked on a full queue so an aborting pipeline
//! can unwind.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// A fixed-capacity concurrent queue with blocking push/pop and close.
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

impl<T> BoundedQueue<T> {
    /// Create an open, empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Push an item, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue has been closed; no further
    /// pushes are permitted after close.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(item);
            }
            if inner.items.len() < inner.capacity {
                break;
            }
            self.not_full.wait(&mut inner);
        }
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop an item, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and fully drained: the
    /// end-of-stream signal for consumers.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Close the queue. Idempotent; wakes all blocked producers and
    /// consumers.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Whether the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = BoundedQueue::new(4);
        assert!(queue.push(1).is_ok());
        assert!(queue.push(2).is_ok());
        assert!(queue.push(3).is_ok());
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
    }

    #[test]
    fn test_close_drains_then_signals_end() {
        let queue = BoundedQueue::new(4);
        assert!(queue.push(10).is_ok());
        assert!(queue.push(20).is_ok());
        queue.close();

        // Remaining items drain first
        assert_eq!(queue.pop(), Some(10));
        assert_eq!(queue.pop(), Some(20));
        // Then end-of-stream
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_after_close_rejected() {
        let queue = BoundedQueue::new(2);
        queue.close();
        assert_eq!(queue.push(5), Err(5));
    }

    #[test]
    fn test_close_is_idempotent() {
        let queue: BoundedQueue<u32> = BoundedQueue::new(2);
        queue.close();
        queue.close();
        assert!(queue.is_closed());
    }

    #[test]
    fn test_push_blocks_until_pop() {
        let queue = Arc::new(BoundedQueue::new(1));
        assert!(queue.push(1).is_ok());

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2).is_ok())
        };

        // The producer is blocked on the full queue until we pop.
        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(queue.pop(), Some(1));
        assert!(producer.join().unwrap());
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn test_close_unblocks_full_producer() {
        let queue = Arc::new(BoundedQueue::new(1));
        assert!(queue.push(1).is_ok());

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };

        thread::sleep(std::time::Duration::from_millis(20));
        queue.close();
        assert_eq!(producer.join().unwrap(), Err(2));
    }

    #[test]
    fn test_many_producers_one_consumer() {
        let queue = Arc::new(BoundedQueue::new(4));
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.push(t * 100 + i).unwrap();
                    }
                })
            })
            .collect();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(v) = queue.pop() {
                    seen.push(v);
                }
                seen
            })
        };

        for p in producers {
            p.join().unwrap();
        }
        queue.close();

        let mut seen = consumer.join().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..400).collect::<Vec<_>>());
    }
}
