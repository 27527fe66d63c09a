//! Thread-safe pool of reusable scratch vectors.
//!
//! Traversals in the hierarchy need short-lived stacks, and background
//! workers (path precomputation and similar) want the same kind of buffer.
//! [`ScratchPool`] recycles them through a bounded crossbeam channel so
//! any thread holding an `Arc<ScratchPool<T>>` can borrow and return
//! buffers while the main cycle runs. This is the only synchronized type
//! in the core; everything else is single-writer.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crossbeam_channel::{Receiver, Sender};

/// Bounded free list of `Vec<T>` buffers.
///
/// At most `capacity` idle buffers are retained; returning a buffer to a
/// full pool drops it.
pub struct ScratchPool<T> {
    tx: Sender<Vec<T>>,
    rx: Receiver<Vec<T>>,
    capacity: usize,
}

// Compile-time assertion: ScratchPool must be Send + Sync for element types
// that are themselves Send.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ScratchPool<u32>>();
};

impl<T> ScratchPool<T> {
    /// Create a pool retaining up to `capacity` idle buffers.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Borrow a cleared buffer. Allocates a fresh one if the pool is empty.
    pub fn take(&self) -> PooledVec<'_, T> {
        let vec = self.rx.try_recv().unwrap_or_default();
        PooledVec {
            vec: Some(vec),
            pool: self,
        }
    }

    /// Return a buffer. It is cleared first; its allocation is kept.
    pub fn give(&self, mut vec: Vec<T>) {
        vec.clear();
        // Full pool: drop the buffer.
        let _ = self.tx.try_send(vec);
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.rx.len()
    }

    /// Maximum number of idle buffers retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> fmt::Debug for ScratchPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchPool")
            .field("idle", &self.idle())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> Default for ScratchPool<T> {
    fn default() -> Self {
        Self::new(8)
    }
}

/// A buffer borrowed from a [`ScratchPool`], returned on drop.
pub struct PooledVec<'a, T> {
    vec: Option<Vec<T>>,
    pool: &'a ScratchPool<T>,
}

impl<T> PooledVec<'_, T> {
    /// Keep the buffer instead of returning it to the pool.
    pub fn detach(mut self) -> Vec<T> {
        self.vec.take().unwrap_or_default()
    }
}

impl<T> Deref for PooledVec<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        self.vec.as_ref().expect("pooled vec present until drop")
    }
}

impl<T> DerefMut for PooledVec<'_, T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        self.vec.as_mut().expect("pooled vec present until drop")
    }
}

impl<T> Drop for PooledVec<'_, T> {
    fn drop(&mut self) {
        if let Some(vec) = self.vec.take() {
            self.pool.give(vec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn take_from_empty_pool_allocates() {
        let pool: ScratchPool<u32> = ScratchPool::new(2);
        let v = pool.take();
        assert!(v.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn dropped_buffer_returns_cleared() {
        let pool: ScratchPool<u32> = ScratchPool::new(2);
        {
            let mut v = pool.take();
            v.extend([1, 2, 3]);
        }
        assert_eq!(pool.idle(), 1);
        let v = pool.take();
        assert!(v.is_empty());
        assert!(v.capacity() >= 3, "allocation is reused");
    }

    #[test]
    fn full_pool_drops_extra_buffers() {
        let pool: ScratchPool<u8> = ScratchPool::new(1);
        pool.give(vec![1]);
        pool.give(vec![2]);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn detach_keeps_buffer_out_of_pool() {
        let pool: ScratchPool<u8> = ScratchPool::new(2);
        let mut v = pool.take();
        v.push(7);
        let owned = v.detach();
        assert_eq!(owned, vec![7]);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let pool: ScratchPool<u8> = ScratchPool::new(0);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let pool: Arc<ScratchPool<u64>> = Arc::new(ScratchPool::new(4));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        let mut v = pool.take();
                        v.push(t * 1000 + i);
                        assert_eq!(v.len(), 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(pool.idle() <= pool.capacity());
        assert!(pool.idle() >= 1);
    }
}
