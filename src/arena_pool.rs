//! Thread-safe arena-pool (spec §4.5): a `Pool` behind a mutex, so parallel
//! producers (e.g. per-thread mesh-load workers) can check fixed-size
//! buffers in and out without each owning an allocator of their own.

use crate::pool::Pool;
use parking_lot::Mutex;

/// Mutex-guarded wrapper over `Pool` for concurrent `acquire`/`release`.
pub struct ArenaPool {
    pool: Mutex<Pool>,
}

impl ArenaPool {
    pub fn create(chunk_size: u64, chunk_count: u64) -> Option<ArenaPool> {
        let pool = Pool::create(chunk_size, chunk_count)?;
        Some(ArenaPool {
            pool: Mutex::new(pool),
        })
    }

    /// Check out one chunk. Returns null if the pool is exhausted.
    pub fn acquire(&self) -> *mut u8 {
        self.pool.lock().alloc()
    }

    /// Return a chunk acquired via `acquire`.
    pub fn release(&self, ptr: *mut u8) -> bool {
        self.pool.lock().free(ptr)
    }

    pub fn free_chunks(&self) -> u64 {
        self.pool.lock().free_chunks()
    }

    pub fn allocated(&self) -> u64 {
        self.pool.lock().allocated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn concurrent_acquire_release_never_oversubscribes() {
        let pool = Arc::new(ArenaPool::create(64, 4).unwrap());
        let successes = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let successes = successes.clone();
            handles.push(std::thread::spawn(move || {
                let ptr = pool.acquire();
                if !ptr.is_null() {
                    successes.fetch_add(1, Ordering::SeqCst);
                    std::thread::yield_now();
                    assert!(pool.release(ptr));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.allocated(), 0);
        assert_eq!(pool.free_chunks(), 4);
        assert!(successes.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn exhaustion_returns_null() {
        let pool = ArenaPool::create(32, 2).unwrap();
        let a = pool.acquire();
        let b = pool.acquire();
        assert!(!a.is_null() && !b.is_null());
        assert!(pool.acquire().is_null());
        assert!(pool.release(a));
        assert!(!pool.acquire().is_null());
    }
}
