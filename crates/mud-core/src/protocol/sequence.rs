//! Thread-safe monotonic counter.
//!
//! Two things on a connection need numbers that never repeat: the `seq`
//! field of every frame header, and the `call_id` that pairs a `Reply` with
//! its `Call`.  Both come from a [`SequenceCounter`].
//!
//! # Why an atomic? (for beginners)
//!
//! A connection's writer task and any number of concurrent callers may ask
//! for the next number at the same time.  `AtomicU64::fetch_add` reads and
//! increments in one indivisible step, so no two callers ever receive the
//! same value and nobody has to wait on a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free counter that starts at 0 and wraps at `u64::MAX`.
///
/// # Examples
///
/// ```rust
/// use mud_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            inner: AtomicU64::new(start),
        }
    }

    /// Returns the next value and advances the counter.
    ///
    /// `Relaxed` ordering is enough: the values only need to be unique, they
    /// do not publish any other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) would produce.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
