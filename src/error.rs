//! Crate-wide error kinds for the compose-layer APIs (render-graph compile,
//! resource realization). Bottom-layer allocators (freelist, arena, dmemory,
//! pool) keep the spec's `bool`/`Option` fast-path contract and log at the
//! call site instead of constructing one of these.

use thiserror::Error;

/// Errors surfaced by the render-graph compiler and resource realization
/// layer, and by the allocator trait's scope bookkeeping.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("freelist exhausted its node storage")]
    OutOfNodes,

    #[error("out of memory requesting {requested} bytes")]
    OutOfMemory { requested: u64 },

    #[error("size computation overflowed")]
    Overflow,

    #[error("double free or overlapping free at offset {offset}, size {size}")]
    DoubleFree { offset: u64, size: u64 },

    #[error("pass '{pass}' uses {resource} without required usage {required:?}")]
    UsageMismatch {
        pass: String,
        resource: String,
        required: &'static str,
    },

    #[error("handle for '{resource}' has a stale generation")]
    HandleInvalidGeneration { resource: String },

    #[error("dependency cycle detected among render-graph passes")]
    DependencyCycle,

    #[error("renderer backend failure: {0}")]
    BackendFailure(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
