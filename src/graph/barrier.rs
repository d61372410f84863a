//! Barrier synthesis (spec §4.12): walks a compiled execution order and
//! emits the minimal set of image/buffer transitions needed before each
//! pass, the way the teacher's `render/cache.rs` hashes only the fields
//! that actually change a pipeline instead of rebuilding eagerly.

use crate::graph::handle::Handle;
use crate::graph::model::{Access, ImageKind, ImageLayout, RgGraph};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreImageBarrier {
    pub handle: Handle,
    pub src_access: Access,
    pub dst_access: Access,
    pub src_layout: ImageLayout,
    pub dst_layout: ImageLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreBufferBarrier {
    pub handle: Handle,
    pub src_access: Access,
    pub dst_access: Access,
}

/// Deterministic layout an access flag transitions a resource into (spec
/// §4.12). Depth images read as `SAMPLED` use the read-only depth layout
/// instead of the generic shader-read layout.
pub fn layout_for_access(access: Access, kind: ImageKind) -> ImageLayout {
    match access {
        Access::ColorAttachment => ImageLayout::ColorAttachmentOptimal,
        Access::DepthAttachment => ImageLayout::DepthStencilAttachmentOptimal,
        Access::DepthReadOnly => ImageLayout::DepthStencilReadOnlyOptimal,
        Access::StorageRead | Access::StorageWrite => ImageLayout::General,
        Access::Sampled => {
            if kind == ImageKind::Depth {
                ImageLayout::DepthStencilReadOnlyOptimal
            } else {
                ImageLayout::ShaderReadOnlyOptimal
            }
        }
        Access::TransferSrc => ImageLayout::TransferSrcOptimal,
        Access::TransferDst => ImageLayout::TransferDstOptimal,
        Access::Present => ImageLayout::PresentSrc,
        Access::None => ImageLayout::Undefined,
    }
}

/// Walk `execution_order`, assigning each pass its `pre_image_barriers`/
/// `pre_buffer_barriers` and leaving every resource's final `(access,
/// layout)` recorded for imported-resource back-out.
pub fn synthesize_barriers(graph: &mut RgGraph, execution_order: &[usize]) {
    for &pass_idx in execution_order {
        let uses = graph.passes[pass_idx].collect_uses();
        let mut image_barriers: SmallVec<[PreImageBarrier; 4]> = SmallVec::new();
        let mut buffer_barriers: SmallVec<[PreBufferBarrier; 4]> = SmallVec::new();

        for use_ in uses.images {
            let Some(image) = graph.images.get_mut(use_.handle) else {
                continue;
            };
            let dst_layout = layout_for_access(use_.access, image.kind);
            if image.current_access != use_.access || image.current_layout != dst_layout {
                image_barriers.push(PreImageBarrier {
                    handle: use_.handle,
                    src_access: image.current_access,
                    dst_access: use_.access,
                    src_layout: image.current_layout,
                    dst_layout,
                });
                image.current_access = use_.access;
                image.current_layout = dst_layout;
            }
        }

        for use_ in uses.buffers {
            let Some(buffer) = graph.buffers.get_mut(use_.handle) else {
                continue;
            };
            if buffer.current_access != use_.access {
                buffer_barriers.push(PreBufferBarrier {
                    handle: use_.handle,
                    src_access: buffer.current_access,
                    dst_access: use_.access,
                });
                buffer.current_access = use_.access;
            }
        }

        let compiled = &mut graph.passes[pass_idx].compiled;
        compiled.pre_image_barriers = image_barriers.into_vec();
        compiled.pre_buffer_barriers = buffer_barriers.into_vec();
    }
}
