//! Threading primitives (spec §6.2): scoped threads, mutexes and condition
//! variables carved out of an arena rather than the system heap, exposed as
//! opaque handles.
//!
//! Unlike the C original these wrap real owned OS resources
//! (`std::thread::JoinHandle`, a lock, a condvar). Because the arena never
//! runs destructors on reset (it is a bump allocator, not a slab with drop
//! glue), callers must `thread_join`/`thread_destroy` a handle before a
//! `reset`/`clear`/`destroy` reclaims the position it lives at.

use crate::arena::Arena;
use crate::tag::MemoryTag;
use lock_api::RawMutex as _;
use parking_lot::RawMutex;

/// An OS thread whose join handle lives in arena memory.
pub struct Thread {
    handle: Option<std::thread::JoinHandle<()>>,
}

/// Create a thread running `func`, storing the handle in `arena`.
pub fn thread_create<'a, F>(arena: &'a mut Arena, func: F) -> Option<&'a mut Thread>
where
    F: FnOnce() + Send + 'static,
{
    let handle = std::thread::Builder::new().spawn(func).ok()?;
    arena.alloc_value(
        Thread {
            handle: Some(handle),
        },
        MemoryTag::Struct,
    )
}

/// Block until `thread` finishes. Returns `false` if the thread panicked.
pub fn thread_join(thread: &mut Thread) -> bool {
    match thread.handle.take() {
        Some(handle) => handle.join().is_ok(),
        None => false,
    }
}

/// Detach `thread` without waiting for completion.
pub fn thread_destroy(thread: &mut Thread) {
    // Dropping a `JoinHandle` detaches the underlying OS thread.
    thread.handle.take();
}

/// A raw, unlock-by-caller mutex with no payload, matching the C-style
/// `mutex_lock`/`mutex_unlock` pair the spec exposes.
pub struct Mutex {
    raw: RawMutex,
}

impl Mutex {
    fn new() -> Mutex {
        Mutex {
            raw: RawMutex::INIT,
        }
    }
}

/// Create a mutex in arena memory.
pub fn mutex_create(arena: &mut Arena) -> Option<&mut Mutex> {
    arena.alloc_value(Mutex::new(), MemoryTag::Struct)
}

pub fn mutex_lock(mutex: &Mutex) {
    mutex.raw.lock();
}

/// # Safety-adjacent contract
/// The caller must currently hold `mutex`'s lock (acquired via
/// `mutex_lock`); unlocking a mutex you don't hold is undefined behavior at
/// the `parking_lot::RawMutex` layer.
pub fn mutex_unlock(mutex: &Mutex) {
    unsafe { mutex.raw.unlock() };
}

pub fn mutex_destroy(_mutex: &mut Mutex) {
    // Arena memory reclaims itself; nothing to release independently.
}

/// A condition variable that waits against a raw `Mutex`.
pub struct CondVar {
    inner: std::sync::Condvar,
    gate: std::sync::Mutex<()>,
}

impl CondVar {
    fn new() -> CondVar {
        CondVar {
            inner: std::sync::Condvar::new(),
            gate: std::sync::Mutex::new(()),
        }
    }
}

pub fn cond_create(arena: &mut Arena) -> Option<&mut CondVar> {
    arena.alloc_value(CondVar::new(), MemoryTag::Struct)
}

/// Atomically unlock `mutex`, wait for a signal, then relock `mutex`.
///
/// The raw mutex and the condvar's internal gate are distinct locks; this
/// mirrors how a pthread condvar is logically independent of the mutex it
/// serializes against, while keeping `Mutex` a real, reusable lock for
/// non-condvar callers.
pub fn cond_wait(cond: &CondVar, mutex: &Mutex) {
    mutex_unlock(mutex);
    let guard = cond.gate.lock().unwrap();
    let _guard = cond.inner.wait(guard).unwrap();
    mutex_lock(mutex);
}

pub fn cond_signal(cond: &CondVar) {
    let _guard = cond.gate.lock().unwrap();
    cond.inner.notify_one();
}

pub fn cond_destroy(_cond: &mut CondVar) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaFlags;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn thread_runs_and_joins() {
        let mut arena = Arena::create(64 * 1024, 4096, ArenaFlags::default()).unwrap();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let thread = thread_create(&mut arena, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert!(thread_join(thread));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mutex_round_trips_lock_unlock() {
        let mut arena = Arena::create(64 * 1024, 4096, ArenaFlags::default()).unwrap();
        let mutex = mutex_create(&mut arena).unwrap();
        mutex_lock(mutex);
        mutex_unlock(mutex);
        mutex_lock(mutex);
        mutex_unlock(mutex);
    }
}
