//! Core memory and scheduling substrate: virtual-memory-backed allocators
//! (arena, DMemory, pool), a uniform allocator trait with statistics and
//! scoped regions, and a render-graph compiler that validates, orders,
//! and realizes physical resources for a Vulkan-style renderer.
//!
//! The renderer backend itself, OS windowing/input, shader compilation,
//! math primitives and the logger are deliberately out of scope; the
//! render-graph compiler treats the renderer as an abstract factory
//! behind [`graph::RendererFacade`].

pub mod allocator;
pub mod arena;
pub mod arena_pool;
pub mod config;
pub mod dmemory;
pub mod error;
pub mod freelist;
pub mod graph;
pub mod platform;
pub mod pool;
pub mod tag;

pub use allocator::{Allocator, ThreadSafeAllocator};
pub use arena::Arena;
pub use arena_pool::ArenaPool;
pub use config::EngineMemoryConfig;
pub use dmemory::DMemory;
pub use error::{CoreError, CoreResult};
pub use pool::Pool;
pub use tag::MemoryTag;
