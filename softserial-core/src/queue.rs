//! Byte queues bridging interrupt time and caller time
//!
//! Each queue is a fixed-capacity FIFO ring. Every operation runs inside a
//! single critical section that does a constant amount of work, so a caller
//! polling `count()` can never observe a half-updated ring and the timer
//! interrupt is delayed by at most a few instructions.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

/// Bounded FIFO of bytes shared between interrupt and normal context
pub struct ByteQueue<const N: usize> {
    ring: Mutex<CriticalSectionRawMutex, RefCell<Deque<u8, N>>>,
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Append a byte; returns false (byte not accepted) if the queue is full
    pub fn try_push(&self, byte: u8) -> bool {
        self.ring
            .lock(|ring| ring.borrow_mut().push_back(byte).is_ok())
    }

    /// Remove the oldest byte
    pub fn try_pop(&self) -> Option<u8> {
        self.ring.lock(|ring| ring.borrow_mut().pop_front())
    }

    /// Remove the oldest byte without checking for emptiness
    ///
    /// # Safety
    ///
    /// The queue must hold at least one byte. Only the consumer side may call
    /// this, after `count()` reported bytes that have not yet been taken.
    #[allow(unsafe_code)]
    pub unsafe fn pop_unchecked(&self) -> u8 {
        // SAFETY: the caller guarantees the queue is not empty, and the
        // producer side only ever adds bytes.
        self.ring
            .lock(|ring| unsafe { ring.borrow_mut().pop_front_unchecked() })
    }

    /// Number of bytes queued
    pub fn count(&self) -> usize {
        self.ring.lock(|ring| ring.borrow().len())
    }

    /// Check if no bytes are queued
    pub fn is_empty(&self) -> bool {
        self.ring.lock(|ring| ring.borrow().is_empty())
    }

    /// Check if the queue is at capacity
    pub fn is_full(&self) -> bool {
        self.ring.lock(|ring| ring.borrow().is_full())
    }

    /// Maximum number of bytes the queue holds
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Discard every queued byte, returning how many were dropped
    pub fn clear(&self) -> usize {
        self.ring.lock(|ring| {
            let mut ring = ring.borrow_mut();
            let dropped = ring.len();
            ring.clear();
            dropped
        })
    }
}
