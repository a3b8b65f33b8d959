//! Bounded divisor queue between the input reader and the transmitter
//!
//! A fixed-capacity ring buffer guarded by a single mutex. Every operation
//! takes the lock once, mutates head/count, and releases it; neither side
//! ever blocks waiting for the other. Callers retry on a full or empty queue.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ring state, only touched under the lock
struct Ring {
    slots: Box<[u32]>,
    head: usize,
    count: usize,
}

/// Single-producer single-consumer FIFO of GPCLK0 divisors
pub struct SampleQueue {
    ring: Mutex<Ring>,
    capacity: usize,
    rejected_pushes: AtomicUsize,
    empty_pulls: AtomicUsize,
}

impl SampleQueue {
    /// Create a new queue holding at most `capacity` divisors
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be non-zero");

        Self {
            ring: Mutex::new(Ring {
                slots: vec![0u32; capacity].into_boxed_slice(),
                head: 0,
                count: 0,
            }),
            capacity,
            rejected_pushes: AtomicUsize::new(0),
            empty_pulls: AtomicUsize::new(0),
        }
    }

    /// Push a divisor onto the tail.
    /// Returns false without blocking if the queue is full.
    pub fn push(&self, divisor: u32) -> bool {
        let mut ring = self.ring.lock();
        if ring.count < self.capacity {
            let tail = (ring.head + ring.count) % self.capacity;
            ring.slots[tail] = divisor;
            ring.count += 1;
            true
        } else {
            drop(ring);
            self.rejected_pushes.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Pull the oldest divisor.
    /// Returns None without blocking if the queue is empty.
    pub fn pull(&self) -> Option<u32> {
        let mut ring = self.ring.lock();
        if ring.count > 0 {
            let divisor = ring.slots[ring.head];
            ring.head = (ring.head + 1) % self.capacity;
            ring.count -= 1;
            Some(divisor)
        } else {
            drop(ring);
            self.empty_pulls.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Number of queued divisors
    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes refused because the queue was full
    pub fn rejected_pushes(&self) -> usize {
        self.rejected_pushes.load(Ordering::Relaxed)
    }

    /// Pulls that found the queue empty
    pub fn empty_pulls(&self) -> usize {
        self.empty_pulls.load(Ordering::Relaxed)
    }
}
