//! Uniform allocator trait (spec §3.5, §4.6): one `alloc`/`alloc_aligned`/
//! `free`/`free_aligned`/`realloc`/`realloc_aligned` surface over the
//! arena, DMemory and pool backends, with statistics kept locally
//! (non-atomically; one allocator, one owning thread) and mirrored into a
//! process-wide atomic snapshot. `ThreadSafeAllocator` adds the `_ts`
//! variants that lock the whole operation, payload and stats together.

pub mod stats;

use crate::arena::Arena;
use crate::dmemory::DMemory;
use crate::pool::Pool;
use crate::tag::MemoryTag;
use parking_lot::Mutex;
use stats::{LocalStats, ScopeSnapshot, GLOBAL};

const DEFAULT_ALIGN: u64 = 16;

/// The concrete allocator an `Allocator` dispatches to. Kept as an enum
/// rather than raw function pointers: each backend's alloc/free/realloc
/// shape differs enough (arena never frees individual pointers, pool only
/// ever hands out one size) that a closed match reads clearer than void
/// pointers and six fn-ptr slots would in Rust.
enum Backend {
    Arena(Arena),
    DMemory(DMemory),
    Pool(Pool),
}

impl Backend {
    fn raw_alloc(&mut self, size: u64, align: u64, tag: MemoryTag) -> *mut u8 {
        match self {
            Backend::Arena(a) => a.alloc_aligned(size, align, tag),
            Backend::DMemory(d) => d.alloc_aligned(size, align),
            Backend::Pool(p) => {
                if size > p.chunk_size() {
                    log::error!("Allocator: requested size {size} exceeds pool chunk_size {}", p.chunk_size());
                    return std::ptr::null_mut();
                }
                p.alloc_aligned(align)
            }
        }
    }

    /// Arenas have no concept of freeing a single pointer (only scope
    /// rewind/reset reclaims bump-allocated memory); the trait layer still
    /// reports the free in statistics since that's what the caller's
    /// lifetime accounting expects.
    fn raw_free(&mut self, ptr: *mut u8, size: u64, align: u64) -> bool {
        match self {
            Backend::Arena(_) => true,
            Backend::DMemory(d) => d.free(ptr, size, align),
            Backend::Pool(p) => p.free(ptr),
        }
    }

    fn raw_realloc(&mut self, ptr: *mut u8, old_size: u64, new_size: u64, align: u64, tag: MemoryTag) -> *mut u8 {
        match self {
            Backend::Arena(a) => {
                let fresh = a.alloc_aligned(new_size, align, tag);
                if fresh.is_null() || ptr.is_null() {
                    return fresh;
                }
                let copy_len = old_size.min(new_size) as usize;
                unsafe { std::ptr::copy_nonoverlapping(ptr, fresh, copy_len) };
                fresh
            }
            Backend::DMemory(d) => d.realloc(ptr, new_size, align),
            Backend::Pool(p) => {
                if new_size > p.chunk_size() {
                    log::error!("Allocator: pool realloc to {new_size} exceeds chunk_size {}", p.chunk_size());
                    std::ptr::null_mut()
                } else {
                    ptr
                }
            }
        }
    }
}

/// One allocator instance: a backend, the tag new allocations are credited
/// under by default, local statistics, and a scope stack.
pub struct Allocator {
    backend: Backend,
    default_tag: MemoryTag,
    stats: LocalStats,
    scopes: Vec<ScopeSnapshot>,
}

impl Allocator {
    pub fn from_arena(arena: Arena, default_tag: MemoryTag) -> Allocator {
        Allocator {
            backend: Backend::Arena(arena),
            default_tag,
            stats: LocalStats::default(),
            scopes: Vec::new(),
        }
    }

    pub fn from_dmemory(dmemory: DMemory, default_tag: MemoryTag) -> Allocator {
        Allocator {
            backend: Backend::DMemory(dmemory),
            default_tag,
            stats: LocalStats::default(),
            scopes: Vec::new(),
        }
    }

    pub fn from_pool(pool: Pool, default_tag: MemoryTag) -> Allocator {
        Allocator {
            backend: Backend::Pool(pool),
            default_tag,
            stats: LocalStats::default(),
            scopes: Vec::new(),
        }
    }

    pub fn stats(&self) -> &LocalStats {
        &self.stats
    }

    pub fn alloc(&mut self, size: u64, tag: MemoryTag) -> *mut u8 {
        self.alloc_aligned(size, DEFAULT_ALIGN, tag)
    }

    pub fn alloc_aligned(&mut self, size: u64, align: u64, tag: MemoryTag) -> *mut u8 {
        let ptr = self.backend.raw_alloc(size, align, tag);
        if !ptr.is_null() {
            self.stats.record_alloc(size, tag);
            GLOBAL.record_alloc(size, tag);
        }
        ptr
    }

    pub fn free(&mut self, ptr: *mut u8, size: u64, tag: MemoryTag) -> bool {
        self.free_aligned(ptr, size, DEFAULT_ALIGN, tag)
    }

    pub fn free_aligned(&mut self, ptr: *mut u8, size: u64, align: u64, tag: MemoryTag) -> bool {
        let ok = self.backend.raw_free(ptr, size, align);
        if ok {
            self.stats.record_free(size, tag);
            GLOBAL.record_free(size, tag);
        }
        ok
    }

    pub fn realloc(&mut self, ptr: *mut u8, old_size: u64, new_size: u64, tag: MemoryTag) -> *mut u8 {
        self.realloc_aligned(ptr, old_size, new_size, DEFAULT_ALIGN, tag)
    }

    pub fn realloc_aligned(&mut self, ptr: *mut u8, old_size: u64, new_size: u64, align: u64, tag: MemoryTag) -> *mut u8 {
        let fresh = self.backend.raw_realloc(ptr, old_size, new_size, align, tag);
        if !fresh.is_null() || new_size == 0 {
            self.stats.record_realloc(old_size, new_size, tag);
            GLOBAL.record_realloc(old_size, new_size, tag);
        }
        fresh
    }

    /// Snapshot byte counters (and, for an arena backend, the bump
    /// position) to later roll back with `end_scope`.
    pub fn begin_scope(&mut self) -> ScopeSnapshot {
        let arena_pos = match &self.backend {
            Backend::Arena(a) => Some(a.pos()),
            _ => None,
        };
        let snapshot = ScopeSnapshot {
            total_allocated: self.stats.total_allocated,
            tagged_allocs: self.stats.tagged_allocs,
            arena_pos,
        };
        self.stats.scope_created += 1;
        self.stats.scope_depth += 1;
        self.scopes.push(snapshot);
        snapshot
    }

    /// Roll back to `snapshot`: for an arena backend, reset the bump
    /// position; for other backends, only statistics move (no underlying
    /// free is issued, matching the "temp region" contract for
    /// non-bump allocators). Temp-byte counters are updated from the
    /// delta between the snapshot and the allocator's state at the time
    /// of the call.
    pub fn end_scope(&mut self, snapshot: ScopeSnapshot, tag: MemoryTag) {
        if let Backend::Arena(a) = &mut self.backend {
            if let Some(target) = snapshot.arena_pos {
                a.reset_to(target, tag);
            }
        }

        let current = self.stats.total_allocated;
        let temp_bytes = current.saturating_sub(snapshot.total_allocated);
        self.stats.scope_bytes_current = temp_bytes;
        self.stats.scope_bytes_peak = self.stats.scope_bytes_peak.max(temp_bytes);

        self.stats.total_allocated = snapshot.total_allocated;
        self.stats.tagged_allocs = snapshot.tagged_allocs;
        self.stats.scope_destroyed += 1;
        self.stats.scope_depth = self.stats.scope_depth.saturating_sub(1);
        self.scopes.pop();
    }
}

unsafe impl Send for Allocator {}

/// `Allocator` behind a mutex: every `_ts` call locks payload and
/// statistics together for the whole operation.
pub struct ThreadSafeAllocator {
    inner: Mutex<Allocator>,
}

impl ThreadSafeAllocator {
    pub fn new(allocator: Allocator) -> ThreadSafeAllocator {
        ThreadSafeAllocator {
            inner: Mutex::new(allocator),
        }
    }

    pub fn alloc_ts(&self, size: u64, tag: MemoryTag) -> *mut u8 {
        self.inner.lock().alloc(size, tag)
    }

    pub fn alloc_aligned_ts(&self, size: u64, align: u64, tag: MemoryTag) -> *mut u8 {
        self.inner.lock().alloc_aligned(size, align, tag)
    }

    pub fn free_ts(&self, ptr: *mut u8, size: u64, tag: MemoryTag) -> bool {
        self.inner.lock().free(ptr, size, tag)
    }

    pub fn free_aligned_ts(&self, ptr: *mut u8, size: u64, align: u64, tag: MemoryTag) -> bool {
        self.inner.lock().free_aligned(ptr, size, align, tag)
    }

    pub fn realloc_ts(&self, ptr: *mut u8, old_size: u64, new_size: u64, tag: MemoryTag) -> *mut u8 {
        self.inner.lock().realloc(ptr, old_size, new_size, tag)
    }

    pub fn realloc_aligned_ts(&self, ptr: *mut u8, old_size: u64, new_size: u64, align: u64, tag: MemoryTag) -> *mut u8 {
        self.inner.lock().realloc_aligned(ptr, old_size, new_size, align, tag)
    }
}
