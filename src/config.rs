//! Memory subsystem configuration (spec ambient stack §C): sizes callers
//! hand to the arena/DMemory/pool constructors, carried as plain data so
//! hosts can build it in code or deserialize it from whatever config
//! format they already use.

use serde::{Deserialize, Serialize};

/// Default sizing for the core allocators. Has no on-disk format of its
/// own; deserialize with whatever the host uses (`rmp_serde`, JSON, TOML,
/// ...) against this shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMemoryConfig {
    /// Bytes reserved up front for a general-purpose arena.
    pub arena_reserve_size: u64,
    /// Bytes committed up front for a general-purpose arena.
    pub arena_commit_size: u64,
    /// Bytes reserved for a `DMemory` instance's virtual range.
    pub dmemory_reserve_size: u64,
    /// Bytes initially committed/tracked by a `DMemory` instance.
    pub dmemory_total_size: u64,
    /// Default chunk size for pool allocators (e.g. per-frame command
    /// buffers, mesh-upload staging blocks).
    pub pool_chunk_size: u64,
    /// Default chunk count for pool allocators.
    pub pool_chunk_count: u64,
    /// Request large pages from the platform VM shim where available.
    pub large_pages: bool,
}

impl Default for EngineMemoryConfig {
    fn default() -> EngineMemoryConfig {
        EngineMemoryConfig {
            arena_reserve_size: 64 * 1024 * 1024,
            arena_commit_size: 1024 * 1024,
            dmemory_reserve_size: 256 * 1024 * 1024,
            dmemory_total_size: 16 * 1024 * 1024,
            pool_chunk_size: 4096,
            pool_chunk_count: 1024,
            large_pages: false,
        }
    }
}
