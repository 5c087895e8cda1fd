//! Reorder buffer: re-serializes out-of-order reader completions into one
//! ordered stream.
//!
//! Reader threads finish chunks in arbitrary order; the engine requires
//! strict ascending `index` order. The buffer is a fixed ring of slots
//! keyed by `index % capacity`. Each slot carries its own expected index,
//! advanced by `capacity` every time the slot is drained, so a producer
//! that raced a full lap ahead blocks instead of overwriting a slot it
//! does not yet own.
//!
//! One consumer ([`ReorderBuffer::withdraw`]) and up to `capacity / 2`
//! concurrent producers ([`ReorderBuffer::deposit`]); this is the sole
//! serialization point between the parallel readers and the single
//! engine-submission path.

use parking_lot::{Condvar, Mutex};

use crate::chunker::WorkItem;

/// Slot ring converting unordered parallel deposits into a single
/// strictly-ascending stream of work items.
pub struct ReorderBuffer {
    inner: Mutex<Slots>,
    /// Signaled when a slot is filled (wakes the consumer).
    ready: Condvar,
    /// Broadcast when a slot is drained (several producers may now fit).
    free: Condvar,
    capacity: usize,
}

struct Slots {
    slots: Vec<Option<WorkItem>>,
    /// Index each slot expects next; `expected[s] ≡ s (mod capacity)`.
    expected: Vec<u64>,
    /// The slot the consumer drains next.
    cursor: usize,
    shutdown: bool,
}

impl ReorderBuffer {
    /// Create a buffer sized for `producer_threads` concurrent readers.
    ///
    /// Capacity is the next power of two ≥ 2× the producer count: each
    /// producer holds at most one outstanding item while waiting, so
    /// 2× is enough to rule out deadlock, and a power of two keeps the
    /// modulo cheap.
    #[must_use]
    pub fn new(producer_threads: usize) -> Self {
        let capacity = (producer_threads.max(1) * 2).next_power_of_two();
        Self {
            inner: Mutex::new(Slots {
                slots: (0..capacity).map(|_| None).collect(),
                expected: (0..capacity as u64).collect(),
                cursor: 0,
                shutdown: false,
            }),
            ready: Condvar::new(),
            free: Condvar::new(),
            capacity,
        }
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Deposit a completed item, blocking until its slot is empty and the
    /// slot's expected index equals `item.index`.
    ///
    /// # Errors
    ///
    /// Returns the item back if the buffer has been shut down.
    pub fn deposit(&self, item: WorkItem) -> Result<(), WorkItem> {
        let slot = (item.index % self.capacity as u64) as usize;
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return Err(item);
            }
            if inner.slots[slot].is_none() && inner.expected[slot] == item.index {
                break;
            }
            self.free.wait(&mut inner);
        }
        inner.slots[slot] = Some(item);
        drop(inner);
        self.ready.notify_one();
        Ok(())
    }

    /// Withdraw the next item in strict ascending index order, blocking
    /// until it arrives.
    ///
    /// Returns `None` after [`ReorderBuffer::shutdown`]. Single consumer
    /// only.
    pub fn withdraw(&self) -> Option<WorkItem> {
        let mut inner = self.inner.lock();
        loop {
            let cursor = inner.cursor;
            if let Some(item) = inner.slots[cursor].take() {
                inner.expected[cursor] += self.capacity as u64;
                inner.cursor = (cursor + 1) % self.capacity;
                drop(inner);
                self.free.notify_all();
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            self.ready.wait(&mut inner);
        }
    }

    /// Abort: wake every blocked producer and the consumer. Deposits fail
    /// and withdrawals return `None` from here on.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        drop(inner);
        self.ready.notify_all();
        self.free.notify_all();
    }
}
