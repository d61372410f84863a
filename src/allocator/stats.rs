//! Allocation statistics (spec §3.5, §4.6): per-allocator counters mirrored
//! into a process-wide atomic snapshot so concurrent allocators can report
//! without tearing, while each allocator's own counters are plain integers
//! under the single-owner-thread contract.

use crate::tag::MemoryTag;
use std::sync::atomic::{AtomicU64, Ordering};

/// Non-atomic counters owned by a single `Allocator` instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStats {
    pub total_allocs: u64,
    pub total_frees: u64,
    pub total_reallocs: u64,
    pub total_zeros: u64,
    pub total_copies: u64,
    pub total_sets: u64,
    pub total_allocated: u64,
    pub tagged_allocs: [u64; MemoryTag::COUNT],
    pub scope_created: u64,
    pub scope_destroyed: u64,
    pub scope_depth: u32,
    pub scope_bytes_current: u64,
    pub scope_bytes_peak: u64,
}

impl LocalStats {
    fn tagged_mut(&mut self, tag: MemoryTag) -> &mut u64 {
        &mut self.tagged_allocs[tag.index()]
    }

    /// Debit/credit `total_allocated` and the per-tag bucket, saturating at
    /// zero on the way down.
    fn apply_delta(&mut self, tag: MemoryTag, delta: i64) {
        if delta >= 0 {
            let d = delta as u64;
            self.total_allocated += d;
            *self.tagged_mut(tag) += d;
        } else {
            let d = (-delta) as u64;
            self.total_allocated = self.total_allocated.saturating_sub(d);
            let bucket = self.tagged_mut(tag);
            *bucket = bucket.saturating_sub(d);
        }
    }

    pub fn record_alloc(&mut self, size: u64, tag: MemoryTag) {
        self.total_allocs += 1;
        self.apply_delta(tag, size as i64);
    }

    pub fn record_free(&mut self, size: u64, tag: MemoryTag) {
        self.total_frees += 1;
        self.apply_delta(tag, -(size as i64));
    }

    pub fn record_realloc(&mut self, old_size: u64, new_size: u64, tag: MemoryTag) {
        self.total_reallocs += 1;
        self.apply_delta(tag, new_size as i64 - old_size as i64);
    }

    pub fn bytes_for(&self, tag: MemoryTag) -> u64 {
        self.tagged_allocs[tag.index()]
    }

    /// Plain-text `TAG: <size>` report over this allocator's tagged buckets
    /// (spec §6.4).
    pub fn format_report(&self) -> String {
        format_tagged_allocs(&self.tagged_allocs)
    }
}

/// Process-wide mirror of `LocalStats`, updated with atomic adds so many
/// allocators can report concurrently without a lock.
pub struct GlobalStats {
    pub total_allocs: AtomicU64,
    pub total_frees: AtomicU64,
    pub total_reallocs: AtomicU64,
    pub total_allocated: AtomicU64,
    pub tagged_allocs: [AtomicU64; MemoryTag::COUNT],
}

impl GlobalStats {
    const fn new() -> GlobalStats {
        // MemoryTag::COUNT is 14; spelled out because `AtomicU64` is not
        // `Copy` so array-repeat syntax can't build the tagged array.
        GlobalStats {
            total_allocs: AtomicU64::new(0),
            total_frees: AtomicU64::new(0),
            total_reallocs: AtomicU64::new(0),
            total_allocated: AtomicU64::new(0),
            tagged_allocs: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    fn apply_delta(&self, tag: MemoryTag, delta: i64) {
        if delta >= 0 {
            let d = delta as u64;
            self.total_allocated.fetch_add(d, Ordering::Relaxed);
            self.tagged_allocs[tag.index()].fetch_add(d, Ordering::Relaxed);
        } else {
            let d = (-delta) as u64;
            saturating_sub_atomic(&self.total_allocated, d);
            saturating_sub_atomic(&self.tagged_allocs[tag.index()], d);
        }
    }

    pub fn record_alloc(&self, size: u64, tag: MemoryTag) {
        self.total_allocs.fetch_add(1, Ordering::Relaxed);
        self.apply_delta(tag, size as i64);
    }

    pub fn record_free(&self, size: u64, tag: MemoryTag) {
        self.total_frees.fetch_add(1, Ordering::Relaxed);
        self.apply_delta(tag, -(size as i64));
    }

    pub fn record_realloc(&self, old_size: u64, new_size: u64, tag: MemoryTag) {
        self.total_reallocs.fetch_add(1, Ordering::Relaxed);
        self.apply_delta(tag, new_size as i64 - old_size as i64);
    }

    pub fn snapshot_total_allocated(&self) -> u64 {
        self.total_allocated.load(Ordering::Relaxed)
    }

    /// Plain-text `TAG: <size>` report over the process-wide tagged buckets
    /// (spec §6.4).
    pub fn format_report(&self) -> String {
        let snapshot: [u64; MemoryTag::COUNT] = std::array::from_fn(|i| self.tagged_allocs[i].load(Ordering::Relaxed));
        format_tagged_allocs(&snapshot)
    }
}

fn saturating_sub_atomic(counter: &AtomicU64, amount: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| Some(cur.saturating_sub(amount)));
}

/// Format a byte count in human-readable units (spec §6.4): whole bytes
/// below 1KB, two decimal places at KB/MB/GB scale.
fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2}GB", b / GB)
    } else if b >= MB {
        format!("{:.2}MB", b / MB)
    } else if b >= KB {
        format!("{:.2}KB", b / KB)
    } else {
        format!("{bytes}B")
    }
}

/// Render a `TAG: <size>` block over every tagged bucket, in `MemoryTag::ALL`
/// order (spec §6.4).
fn format_tagged_allocs(tagged_allocs: &[u64; MemoryTag::COUNT]) -> String {
    let mut out = String::new();
    for tag in MemoryTag::ALL {
        out.push_str(&format!("{}: {}\n", tag.name(), human_size(tagged_allocs[tag.index()])));
    }
    out
}

pub static GLOBAL: GlobalStats = GlobalStats::new();

/// A snapshot of `total_allocated` and per-tag bytes captured by
/// `begin_scope`, restored (for byte accounting) by `end_scope`.
#[derive(Debug, Clone, Copy)]
pub struct ScopeSnapshot {
    pub total_allocated: u64,
    pub tagged_allocs: [u64; MemoryTag::COUNT],
    pub arena_pos: Option<u64>,
}
