//! Renderer facade (spec §6.3, C11): the abstract resource factory the
//! compiler calls into for everything it cannot allocate itself. The graph
//! only ever calls through this trait; it never implements one.

use crate::graph::model::{ImageLayout, PhysicalHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    DeviceLocal,
    HostVisibleCoherent,
}

#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub layers: u32,
    pub samples: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassAttachmentDesc {
    pub format_hash: u64,
    pub load_op: crate::graph::model::LoadOp,
    pub store_op: crate::graph::model::StoreOp,
    pub clear_value: [f32; 4],
    pub samples: u32,
}

#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<RenderPassAttachmentDesc>,
    pub depth_attachment: Option<RenderPassAttachmentDesc>,
}

#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub renderpass: PhysicalHandle,
    pub attachments: Vec<PhysicalHandle>,
    pub extent: (u32, u32),
}

/// The abstract Vulkan-backed factory the compiler realizes physical
/// resources through. Deliberately out of scope to implement (spec §1);
/// this crate only defines and calls the interface.
pub trait RendererFacade {
    fn window_attachment_count(&self) -> u32;
    fn window_attachment_get(&mut self, index: u32) -> Option<PhysicalHandle>;
    fn depth_attachment_get(&mut self) -> Option<PhysicalHandle>;

    fn create_render_target_texture(&mut self, desc: &TextureDesc) -> Option<PhysicalHandle>;
    fn create_depth_attachment(&mut self, width: u32, height: u32) -> Option<PhysicalHandle>;
    fn create_sampled_depth_attachment(&mut self, width: u32, height: u32) -> Option<PhysicalHandle>;
    fn create_sampled_depth_attachment_array(&mut self, width: u32, height: u32, layers: u32) -> Option<PhysicalHandle>;
    fn resize_texture(&mut self, texture: PhysicalHandle, width: u32, height: u32, preserve: bool) -> bool;
    fn destroy_texture(&mut self, texture: PhysicalHandle);

    fn renderpass_create_desc(&mut self, desc: &RenderPassDesc) -> Option<PhysicalHandle>;
    fn renderpass_destroy(&mut self, renderpass: PhysicalHandle);

    fn render_target_create(&mut self, desc: &RenderTargetDesc) -> Option<PhysicalHandle>;
    fn render_target_destroy(&mut self, target: PhysicalHandle);

    fn buffer_create(&mut self, size: u64, memory_kind: MemoryKind, init_data: Option<&[u8]>) -> Option<PhysicalHandle>;
    fn buffer_destroy(&mut self, buffer: PhysicalHandle);

    fn begin_renderpass(&mut self, renderpass: PhysicalHandle, target: PhysicalHandle);
    fn end_renderpass(&mut self);

    fn current_image_index(&self) -> u32;
    fn apply_image_barrier(&mut self, texture: PhysicalHandle, barrier: crate::graph::barrier::PreImageBarrier);
    fn apply_buffer_barrier(&mut self, buffer: PhysicalHandle, barrier: crate::graph::barrier::PreBufferBarrier);

    fn wait_idle(&mut self);
    fn get_error_string(&self, code: i32) -> String;
}

/// Layout a freshly-imported resource should be assumed to start in absent
/// a prior frame's barrier state (spec §4.12).
pub fn initial_imported_layout() -> ImageLayout {
    ImageLayout::Undefined
}
