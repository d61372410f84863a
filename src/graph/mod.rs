//! Render-graph bookkeeping and compiler (spec §3.6, §4.7–§4.15): a
//! declarative DAG of passes and resources that validates usage, tracks
//! read/write dependencies, culls unreachable passes, orders execution,
//! analyzes resource lifetimes, synthesizes transition barriers, realizes
//! physical backing through a renderer facade, and caches renderpass/
//! render-target objects across frames.

pub mod barrier;
pub mod cache;
pub mod compile;
pub mod cull;
pub mod edges;
pub mod execute;
pub mod handle;
pub mod lifetime;
pub mod model;
pub mod realize;
pub mod renderer;
pub mod toposort;

pub use cache::RenderTargetCache;
pub use compile::{compile, RenderGraphApplyResult, RenderGraphState};
pub use execute::execute;
pub use handle::{Handle, HandleTable};
pub use model::{
    Access, Attachment, BufferDesc, BufferUsageFlags, ImageDesc, ImageKind, ImageLayout, ImageUsageFlags, ImportedResource, LoadOp,
    PassFlags, PassType, PhysicalHandle, ResourceFlags, RgBuffer, RgGraph, RgImage, RgPass, StoreOp,
};
pub use barrier::{PreBufferBarrier, PreImageBarrier};
pub use renderer::{MemoryKind, RenderPassAttachmentDesc, RenderPassDesc, RenderTargetDesc, RendererFacade, TextureDesc};
