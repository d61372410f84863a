//! Render-graph data model (spec §3.6): typed, generation-checked handles
//! to images, buffers and passes, with descriptors carrying usage flags,
//! attachments and per-pass declared reads/writes. Generalizes the
//! teacher's `RenderGraphResource`/`RenderGraphNode` (which track opaque
//! `LogicalId`s and untyped params) into the concrete image/buffer/pass
//! shape this graph compiles.

use crate::graph::barrier::{PreBufferBarrier, PreImageBarrier};
use crate::graph::handle::{Handle, HandleTable};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImageUsageFlags: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 1;
        const SAMPLED = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
        const STORAGE = 1 << 5;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsageFlags: u32 {
        const VERTEX_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
    }
}

bitflags! {
    /// Shared by images and buffers; not every bit applies to both (e.g.
    /// `FORCE_ARRAY` only makes sense for images).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceFlags: u32 {
        const PER_IMAGE = 1 << 0;
        const PERSISTENT = 1 << 1;
        const EXTERNAL = 1 << 2;
        const RESIZABLE = 1 << 3;
        const FORCE_ARRAY = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PassFlags: u32 {
        const DISABLED = 1 << 0;
        const NO_CULL = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassType {
    Graphics,
    Compute,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Color,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// The access a pass declares against an image or buffer. Maps
/// deterministically to a Vulkan-style layout in `barrier::layout_for_access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    None,
    ColorAttachment,
    DepthAttachment,
    DepthReadOnly,
    Sampled,
    StorageRead,
    StorageWrite,
    TransferSrc,
    TransferDst,
    Present,
}

impl Access {
    /// The image/buffer usage bit a pass declaring this access must hold
    /// (spec §4.7). `None` requires nothing (used for default-init state,
    /// never declared directly by a pass).
    pub fn required_image_usage(self) -> Option<ImageUsageFlags> {
        match self {
            Access::ColorAttachment => Some(ImageUsageFlags::COLOR_ATTACHMENT),
            Access::DepthAttachment | Access::DepthReadOnly => Some(ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT),
            Access::Sampled => Some(ImageUsageFlags::SAMPLED),
            Access::TransferSrc => Some(ImageUsageFlags::TRANSFER_SRC),
            Access::TransferDst => Some(ImageUsageFlags::TRANSFER_DST),
            Access::StorageRead | Access::StorageWrite => Some(ImageUsageFlags::STORAGE),
            Access::Present | Access::None => None,
        }
    }

    /// The buffer usage bit a pass declaring this access against a buffer
    /// must hold (spec §4.7 bullet 4). Access kinds that only make sense
    /// against images (`ColorAttachment`, depth variants, `Sampled`,
    /// `Present`) require nothing here; a pass declaring one of those
    /// against a buffer handle is a caller bug this check does not police.
    pub fn required_buffer_usage(self) -> Option<BufferUsageFlags> {
        match self {
            Access::StorageRead | Access::StorageWrite => Some(BufferUsageFlags::STORAGE),
            Access::TransferSrc => Some(BufferUsageFlags::TRANSFER_SRC),
            Access::TransferDst => Some(BufferUsageFlags::TRANSFER_DST),
            _ => None,
        }
    }

    /// Whether this access writes the resource (spec §4.8 read/write
    /// classification).
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Access::ColorAttachment | Access::DepthAttachment | Access::StorageWrite | Access::TransferDst
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    General,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    PresentSrc,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageSlice {
    pub mip: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

#[derive(Debug, Clone)]
pub struct ImageDesc {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub layers: u32,
    pub samples: u32,
    pub kind: ImageKind,
    pub usage_flags: ImageUsageFlags,
    pub flags: ResourceFlags,
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub size: u64,
    pub usage_flags: BufferUsageFlags,
    pub flags: ResourceFlags,
}

#[derive(Debug, Clone, Copy)]
pub struct ImportedResource {
    pub layout: ImageLayout,
    pub access: Access,
}

/// Opaque per-index physical backing handed back by the renderer facade
/// (spec §6.3); the graph never inspects it, only allocates/releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalHandle(pub u64);

#[derive(Debug, Clone)]
pub struct RgImage {
    pub name: String,
    pub desc: ImageDesc,
    pub kind: ImageKind,
    pub lifetime: (u32, u32),
    pub imported: Option<ImportedResource>,
    pub textures: Vec<PhysicalHandle>,
    pub texture_generation: u64,
    pub bytes_per_texture: u64,
    pub current_access: Access,
    pub current_layout: ImageLayout,
}

impl RgImage {
    pub fn new(name: impl Into<String>, desc: ImageDesc) -> RgImage {
        let kind = desc.kind;
        RgImage {
            name: name.into(),
            desc,
            kind,
            lifetime: (u32::MAX, 0),
            imported: None,
            textures: Vec::new(),
            texture_generation: 0,
            bytes_per_texture: 0,
            current_access: Access::None,
            current_layout: ImageLayout::Undefined,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RgBuffer {
    pub name: String,
    pub desc: BufferDesc,
    pub lifetime: (u32, u32),
    pub imported: Option<ImportedResource>,
    pub buffers: Vec<PhysicalHandle>,
    pub current_access: Access,
}

impl RgBuffer {
    pub fn new(name: impl Into<String>, desc: BufferDesc) -> RgBuffer {
        RgBuffer {
            name: name.into(),
            desc,
            lifetime: (u32::MAX, 0),
            imported: None,
            buffers: Vec::new(),
            current_access: Access::None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Attachment {
    pub image: Handle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: [f32; 4],
    pub slice: ImageSlice,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageUse {
    pub handle: Handle,
    pub access: Access,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferUse {
    pub handle: Handle,
    pub access: Access,
}

/// State produced by the compiler passes; empty/default until `compile`
/// runs, read-only after.
#[derive(Debug, Clone, Default)]
pub struct PassCompiledState {
    pub culled: bool,
    pub out_edges: Vec<usize>,
    pub in_edges: Vec<usize>,
    pub pre_image_barriers: Vec<PreImageBarrier>,
    pub pre_buffer_barriers: Vec<PreBufferBarrier>,
    pub renderpass: Option<PhysicalHandle>,
    pub render_targets: Vec<PhysicalHandle>,
    pub render_target_count: u32,
}

/// The per-pass callback invoked during `execute` (spec §4.15). Takes the
/// pass's own index so a host can look up its compiled barriers/targets.
pub type PassCallback = Box<dyn FnMut(usize) + Send>;

pub struct RgPass {
    pub name: String,
    pub pass_type: PassType,
    pub domain: u32,
    pub flags: PassFlags,
    pub color_attachments: Vec<Attachment>,
    pub depth_attachment: Option<Attachment>,
    pub image_reads: Vec<ImageUse>,
    pub image_writes: Vec<ImageUse>,
    pub buffer_reads: Vec<BufferUse>,
    pub buffer_writes: Vec<BufferUse>,
    pub execute_callback: Option<PassCallback>,
    pub compiled: PassCompiledState,
}

impl std::fmt::Debug for RgPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgPass")
            .field("name", &self.name)
            .field("pass_type", &self.pass_type)
            .field("flags", &self.flags)
            .field("compiled", &self.compiled)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceUse {
    pub handle: Handle,
    pub access: Access,
    pub is_write: bool,
}

/// Every (handle, access, read-or-write) triple a pass touches, attachments
/// folded in (spec §4.8: color/depth attachments join the read/write sweep,
/// classified by `LOAD_OP == LOAD` / read-only depth rather than by the
/// barrier access variant alone).
pub struct PassUses {
    pub images: Vec<ResourceUse>,
    pub buffers: Vec<ResourceUse>,
}

impl RgPass {
    pub fn new(name: impl Into<String>, pass_type: PassType) -> RgPass {
        RgPass {
            name: name.into(),
            pass_type,
            domain: 0,
            flags: PassFlags::empty(),
            color_attachments: Vec::new(),
            depth_attachment: None,
            image_reads: Vec::new(),
            image_writes: Vec::new(),
            buffer_reads: Vec::new(),
            buffer_writes: Vec::new(),
            execute_callback: None,
            compiled: PassCompiledState::default(),
        }
    }

    /// Attachments contribute a read (`LOAD_OP == LOAD`, or read-only
    /// depth) or a write (anything else) in addition to the explicit
    /// `image_reads`/`image_writes` lists.
    pub fn collect_uses(&self) -> PassUses {
        let mut images = Vec::new();
        let mut buffers = Vec::new();

        for use_ in &self.image_reads {
            images.push(ResourceUse {
                handle: use_.handle,
                access: use_.access,
                is_write: false,
            });
        }
        for use_ in &self.image_writes {
            images.push(ResourceUse {
                handle: use_.handle,
                access: use_.access,
                is_write: true,
            });
        }
        for attachment in &self.color_attachments {
            images.push(ResourceUse {
                handle: attachment.image,
                access: Access::ColorAttachment,
                is_write: attachment.load_op != LoadOp::Load,
            });
        }
        if let Some(attachment) = &self.depth_attachment {
            let read_only = attachment.load_op == LoadOp::Load;
            images.push(ResourceUse {
                handle: attachment.image,
                access: if read_only { Access::DepthReadOnly } else { Access::DepthAttachment },
                is_write: !read_only,
            });
        }
        for use_ in &self.buffer_reads {
            buffers.push(ResourceUse {
                handle: use_.handle,
                access: use_.access,
                is_write: false,
            });
        }
        for use_ in &self.buffer_writes {
            buffers.push(ResourceUse {
                handle: use_.handle,
                access: use_.access,
                is_write: true,
            });
        }

        PassUses { images, buffers }
    }

    /// Every image this pass writes: explicit writes plus non-load-only
    /// attachments (spec §4.9 culling seeds from present-image writers).
    pub fn written_images(&self) -> Vec<Handle> {
        let mut out: Vec<Handle> = self.image_writes.iter().map(|u| u.handle).collect();
        for attachment in &self.color_attachments {
            out.push(attachment.image);
        }
        if let Some(attachment) = &self.depth_attachment {
            if attachment.load_op != LoadOp::Load {
                out.push(attachment.image);
            }
        }
        out
    }

    pub fn written_buffers(&self) -> Vec<Handle> {
        self.buffer_writes.iter().map(|u| u.handle).collect()
    }

    pub fn is_disabled(&self) -> bool {
        self.flags.contains(PassFlags::DISABLED)
    }

    pub fn is_no_cull(&self) -> bool {
        self.flags.contains(PassFlags::NO_CULL)
    }
}

/// The render-graph's mutable bookkeeping across one frame: declared
/// images/buffers (generation-checked) and passes in declaration order.
/// Mutated only between `begin_frame` and `compile`; read-only afterward
/// (spec §5 shared-resource policy).
#[derive(Default)]
pub struct RgGraph {
    pub images: HandleTable<RgImage>,
    pub buffers: HandleTable<RgBuffer>,
    pub passes: Vec<RgPass>,
    pub present_image: Option<Handle>,
    pub export_images: Vec<Handle>,
    pub export_buffers: Vec<Handle>,
    pub execution_order: Vec<usize>,
    pub bytes_allocated: u64,
}

impl RgGraph {
    pub fn new() -> RgGraph {
        RgGraph::default()
    }

    /// Clear per-frame declarations, preserving persistent/external
    /// resources and previously-populated cache state (spec §3.6 graph
    /// lifecycle).
    pub fn begin_frame(&mut self) {
        self.passes.clear();
        self.execution_order.clear();
        self.present_image = None;
        self.export_images.clear();
        self.export_buffers.clear();

        let stale: Vec<Handle> = self
            .images
            .iter()
            .filter(|(_, image)| !image.desc.flags.intersects(ResourceFlags::PERSISTENT | ResourceFlags::EXTERNAL))
            .map(|(h, _)| h)
            .collect();
        for handle in stale {
            self.images.destroy(handle);
        }
        let stale: Vec<Handle> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| !buffer.desc.flags.intersects(ResourceFlags::PERSISTENT | ResourceFlags::EXTERNAL))
            .map(|(h, _)| h)
            .collect();
        for handle in stale {
            self.buffers.destroy(handle);
        }
    }

    pub fn declare_image(&mut self, name: impl Into<String>, desc: ImageDesc) -> Handle {
        self.images.insert(RgImage::new(name, desc))
    }

    pub fn declare_buffer(&mut self, name: impl Into<String>, desc: BufferDesc) -> Handle {
        self.buffers.insert(RgBuffer::new(name, desc))
    }

    pub fn add_pass(&mut self, pass: RgPass) -> usize {
        self.passes.push(pass);
        self.passes.len() - 1
    }

    pub fn destroy_image(&mut self, handle: Handle) {
        self.images.destroy(handle);
    }

    pub fn destroy_buffer(&mut self, handle: Handle) {
        self.buffers.destroy(handle);
    }

    /// Retire transient (non-persistent/external) resources at the end of
    /// a frame (spec §3.6 graph lifecycle: `end_frame`).
    pub fn end_frame(&mut self) {
        let stale: Vec<Handle> = self
            .images
            .iter()
            .filter(|(_, image)| !image.desc.flags.intersects(ResourceFlags::PERSISTENT | ResourceFlags::EXTERNAL))
            .map(|(h, _)| h)
            .collect();
        for handle in stale {
            self.images.destroy(handle);
        }
    }
}
