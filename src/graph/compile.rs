//! Compile orchestration (spec §4.7–§4.13): validation, then the edges →
//! cull → toposort → lifetime → barrier → realize → cache pipeline, plus
//! the fallback-graph safety net the teacher's `RenderGraphState` adds on
//! top of its own `apply_graph`.

use crate::error::CoreError;
use crate::graph::cache::RenderTargetCache;
use crate::graph::cull::cull_dead_passes;
use crate::graph::edges::build_dependency_edges;
use crate::graph::lifetime::analyze_lifetimes;
use crate::graph::model::{Attachment, PassType, RgGraph};
use crate::graph::realize::realize_resources;
use crate::graph::renderer::RendererFacade;
use crate::graph::toposort::topological_sort;

/// Checks an attachment's declared mip/layer slice against the image's
/// actual extent (spec §4.7 bullet 5): `mip` must be in range, `layer_count`
/// must be nonzero, and `base_layer + layer_count` must not exceed the
/// image's layer count.
fn validate_attachment_slice(graph: &RgGraph, pass_name: &str, attachment: &Attachment) -> Result<(), CoreError> {
    let Some(image) = graph.images.get(attachment.image) else {
        return Err(CoreError::HandleInvalidGeneration {
            resource: pass_name.to_string(),
        });
    };
    let slice = attachment.slice;
    let last_layer = slice.base_layer.checked_add(slice.layer_count);
    let in_range = slice.layer_count > 0 && slice.mip < image.desc.mip_levels && last_layer.is_some_and(|l| l <= image.desc.layers);
    if !in_range {
        return Err(CoreError::InvalidArgument(format!(
            "pass '{}' attachment '{}' slice out of range (mip {} of {}, layers {}..{} of {})",
            pass_name,
            image.name,
            slice.mip,
            image.desc.mip_levels,
            slice.base_layer,
            slice.base_layer.saturating_add(slice.layer_count),
            image.desc.layers,
        )));
    }
    Ok(())
}

/// Checks every declared use against the resource's generation and
/// required usage bits, and every graphics pass's attachment declarations,
/// before any compiler pass runs (spec §4.7, §8.4).
fn validate(graph: &RgGraph) -> Result<(), CoreError> {
    for pass in &graph.passes {
        if pass.is_disabled() {
            continue;
        }

        if pass.pass_type == PassType::Graphics && pass.color_attachments.is_empty() && pass.depth_attachment.is_none() {
            return Err(CoreError::InvalidArgument(format!(
                "graphics pass '{}' has no color or depth attachment",
                pass.name
            )));
        }
        for attachment in &pass.color_attachments {
            validate_attachment_slice(graph, &pass.name, attachment)?;
        }
        if let Some(attachment) = &pass.depth_attachment {
            validate_attachment_slice(graph, &pass.name, attachment)?;
        }

        let uses = pass.collect_uses();
        for use_ in &uses.images {
            let Some(image) = graph.images.get(use_.handle) else {
                return Err(CoreError::HandleInvalidGeneration {
                    resource: pass.name.clone(),
                });
            };
            if let Some(required) = use_.access.required_image_usage() {
                if !image.desc.usage_flags.contains(required) {
                    log::error!("render graph: pass '{}' uses image '{}' without required usage", pass.name, image.name);
                    return Err(CoreError::UsageMismatch {
                        pass: pass.name.clone(),
                        resource: image.name.clone(),
                        required: "image usage bit",
                    });
                }
            }
        }
        for use_ in &uses.buffers {
            let Some(buffer) = graph.buffers.get(use_.handle) else {
                return Err(CoreError::HandleInvalidGeneration {
                    resource: pass.name.clone(),
                });
            };
            if let Some(required) = use_.access.required_buffer_usage() {
                if !buffer.desc.usage_flags.contains(required) {
                    log::error!("render graph: pass '{}' uses buffer '{}' without required usage", pass.name, buffer.name);
                    return Err(CoreError::UsageMismatch {
                        pass: pass.name.clone(),
                        resource: buffer.name.clone(),
                        required: "buffer usage bit",
                    });
                }
            }
        }
    }
    Ok(())
}

/// Run the full compiler pipeline: validate, build edges, cull, order,
/// analyze lifetimes, synthesize barriers, realize physical resources, and
/// populate the renderpass/render-target cache for graphics passes.
pub fn compile<R: RendererFacade>(graph: &mut RgGraph, renderer: &mut R, cache: &mut RenderTargetCache) -> Result<(), CoreError> {
    validate(graph)?;

    build_dependency_edges(graph);
    cull_dead_passes(graph);
    topological_sort(graph)?;
    analyze_lifetimes(graph);
    crate::graph::barrier::synthesize_barriers(graph, &graph.execution_order.clone());
    realize_resources(graph, renderer)?;

    cache.begin_frame();
    let graphics_passes: Vec<usize> = graph
        .execution_order
        .iter()
        .copied()
        .filter(|&idx| graph.passes[idx].pass_type == PassType::Graphics)
        .collect();
    let RgGraph { images, passes, .. } = graph;
    for idx in graphics_passes {
        let pass = &mut passes[idx];
        cache.get_or_create(images, pass, renderer)?;
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderGraphApplyResult {
    Applied,
    FallbackUsed,
}

/// Wraps a graph builder with a known-good fallback plan the way the
/// teacher's `RenderGraphState` does: hosts that hot-reload graph
/// descriptions can opt into falling back instead of hard failing.
pub struct RenderGraphState<Build> {
    fallback: Option<Build>,
}

impl<Build> RenderGraphState<Build>
where
    Build: Fn(&mut RgGraph),
{
    pub fn new() -> RenderGraphState<Build> {
        RenderGraphState { fallback: None }
    }

    pub fn set_fallback(&mut self, build: Build) {
        self.fallback = Some(build);
    }

    /// Build `graph` with `build`, compile it, and on failure — if a
    /// fallback plan was registered and `use_fallback` is set — rebuild
    /// from the fallback plan and compile that instead. `compile` itself
    /// still fails outright when no fallback is requested.
    pub fn apply_graph<R: RendererFacade>(
        &self,
        graph: &mut RgGraph,
        renderer: &mut R,
        cache: &mut RenderTargetCache,
        build: impl Fn(&mut RgGraph),
        use_fallback: bool,
    ) -> Result<RenderGraphApplyResult, CoreError> {
        graph.begin_frame();
        build(graph);
        match compile(graph, renderer, cache) {
            Ok(()) => Ok(RenderGraphApplyResult::Applied),
            Err(err) => {
                if use_fallback {
                    if let Some(fallback) = &self.fallback {
                        log::warn!("render graph compile failed ({err}), falling back to known-good plan");
                        graph.begin_frame();
                        fallback(graph);
                        compile(graph, renderer, cache)?;
                        return Ok(RenderGraphApplyResult::FallbackUsed);
                    }
                }
                Err(err)
            }
        }
    }
}

impl<Build> Default for RenderGraphState<Build>
where
    Build: Fn(&mut RgGraph),
{
    fn default() -> RenderGraphState<Build> {
        RenderGraphState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{
        Access, BufferDesc, BufferUsageFlags, BufferUse, ImageDesc, ImageKind, ImageUsageFlags, ImageUse, PhysicalHandle, ResourceFlags,
        RgPass,
    };
    use crate::graph::renderer::{MemoryKind, RenderPassDesc, RenderTargetDesc, TextureDesc};

    #[derive(Default)]
    struct FakeRenderer {
        next_handle: u64,
    }

    impl FakeRenderer {
        fn next(&mut self) -> PhysicalHandle {
            self.next_handle += 1;
            PhysicalHandle(self.next_handle)
        }
    }

    impl RendererFacade for FakeRenderer {
        fn window_attachment_count(&self) -> u32 {
            1
        }
        fn window_attachment_get(&mut self, _index: u32) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn depth_attachment_get(&mut self) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn create_render_target_texture(&mut self, _desc: &TextureDesc) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn create_depth_attachment(&mut self, _width: u32, _height: u32) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn create_sampled_depth_attachment(&mut self, _width: u32, _height: u32) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn create_sampled_depth_attachment_array(&mut self, _width: u32, _height: u32, _layers: u32) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn resize_texture(&mut self, _texture: PhysicalHandle, _width: u32, _height: u32, _preserve: bool) -> bool {
            true
        }
        fn destroy_texture(&mut self, _texture: PhysicalHandle) {}
        fn renderpass_create_desc(&mut self, _desc: &RenderPassDesc) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn renderpass_destroy(&mut self, _renderpass: PhysicalHandle) {}
        fn render_target_create(&mut self, _desc: &RenderTargetDesc) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn render_target_destroy(&mut self, _target: PhysicalHandle) {}
        fn buffer_create(&mut self, _size: u64, _memory_kind: MemoryKind, _init_data: Option<&[u8]>) -> Option<PhysicalHandle> {
            Some(self.next())
        }
        fn buffer_destroy(&mut self, _buffer: PhysicalHandle) {}
        fn begin_renderpass(&mut self, _renderpass: PhysicalHandle, _target: PhysicalHandle) {}
        fn end_renderpass(&mut self) {}
        fn current_image_index(&self) -> u32 {
            0
        }
        fn apply_image_barrier(&mut self, _texture: PhysicalHandle, _barrier: crate::graph::barrier::PreImageBarrier) {}
        fn apply_buffer_barrier(&mut self, _buffer: PhysicalHandle, _barrier: crate::graph::barrier::PreBufferBarrier) {}
        fn wait_idle(&mut self) {}
        fn get_error_string(&self, _code: i32) -> String {
            String::new()
        }
    }

    #[test]
    fn usage_mismatch_is_rejected_before_any_pass_runs() {
        let mut graph = RgGraph::new();
        let image = graph.declare_image(
            "color",
            ImageDesc {
                format: "rgba8".into(),
                width: 64,
                height: 64,
                mip_levels: 1,
                layers: 1,
                samples: 1,
                kind: ImageKind::Color,
                usage_flags: ImageUsageFlags::SAMPLED,
                flags: ResourceFlags::empty(),
            },
        );
        let mut pass = RgPass::new("p", PassType::Graphics);
        pass.color_attachments.push(crate::graph::model::Attachment {
            image,
            load_op: crate::graph::model::LoadOp::Clear,
            store_op: crate::graph::model::StoreOp::Store,
            clear_value: [0.0; 4],
            slice: crate::graph::model::ImageSlice {
                mip: 0,
                base_layer: 0,
                layer_count: 1,
            },
        });
        pass.image_writes.push(ImageUse {
            handle: image,
            access: Access::ColorAttachment,
        });
        graph.add_pass(pass);
        graph.export_images.push(image);

        let mut renderer = FakeRenderer::default();
        let mut cache = RenderTargetCache::new();
        let result = compile(&mut graph, &mut renderer, &mut cache);

        assert!(matches!(result, Err(CoreError::UsageMismatch { .. })));
    }

    #[test]
    fn destroyed_image_fails_compile_with_invalid_generation() {
        let mut graph = RgGraph::new();
        let image = graph.declare_buffer(
            "b",
            BufferDesc {
                size: 64,
                usage_flags: BufferUsageFlags::STORAGE,
                flags: ResourceFlags::empty(),
            },
        );
        graph.destroy_buffer(image);

        let mut pass = RgPass::new("p", PassType::Compute);
        pass.buffer_writes.push(BufferUse {
            handle: image,
            access: Access::StorageWrite,
        });
        graph.add_pass(pass);

        let mut renderer = FakeRenderer::default();
        let mut cache = RenderTargetCache::new();
        let result = compile(&mut graph, &mut renderer, &mut cache);

        assert!(matches!(result, Err(CoreError::HandleInvalidGeneration { .. })));
    }

    #[test]
    fn simple_graph_compiles_and_orders_passes() {
        let mut graph = RgGraph::new();
        let image = graph.declare_image(
            "color",
            ImageDesc {
                format: "rgba8".into(),
                width: 64,
                height: 64,
                mip_levels: 1,
                layers: 1,
                samples: 1,
                kind: ImageKind::Color,
                usage_flags: ImageUsageFlags::COLOR_ATTACHMENT,
                flags: ResourceFlags::empty(),
            },
        );
        let mut pass = RgPass::new("p", PassType::Graphics);
        pass.color_attachments.push(crate::graph::model::Attachment {
            image,
            load_op: crate::graph::model::LoadOp::Clear,
            store_op: crate::graph::model::StoreOp::Store,
            clear_value: [0.0; 4],
            slice: crate::graph::model::ImageSlice {
                mip: 0,
                base_layer: 0,
                layer_count: 1,
            },
        });
        graph.add_pass(pass);
        graph.export_images.push(image);

        let mut renderer = FakeRenderer::default();
        let mut cache = RenderTargetCache::new();
        compile(&mut graph, &mut renderer, &mut cache).unwrap();

        assert_eq!(graph.execution_order, vec![0]);
        assert!(graph.passes[0].compiled.renderpass.is_some());
    }

    #[test]
    fn graphics_pass_without_attachments_fails_compile() {
        let mut graph = RgGraph::new();
        let pass = RgPass::new("empty", PassType::Graphics);
        graph.add_pass(pass);

        let mut renderer = FakeRenderer::default();
        let mut cache = RenderTargetCache::new();
        let result = compile(&mut graph, &mut renderer, &mut cache);

        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn attachment_slice_out_of_range_fails_compile() {
        let mut graph = RgGraph::new();
        let image = graph.declare_image(
            "color",
            ImageDesc {
                format: "rgba8".into(),
                width: 64,
                height: 64,
                mip_levels: 1,
                layers: 1,
                samples: 1,
                kind: ImageKind::Color,
                usage_flags: ImageUsageFlags::COLOR_ATTACHMENT,
                flags: ResourceFlags::empty(),
            },
        );
        let mut pass = RgPass::new("p", PassType::Graphics);
        pass.color_attachments.push(crate::graph::model::Attachment {
            image,
            load_op: crate::graph::model::LoadOp::Clear,
            store_op: crate::graph::model::StoreOp::Store,
            clear_value: [0.0; 4],
            slice: crate::graph::model::ImageSlice {
                mip: 3,
                base_layer: 0,
                layer_count: 1,
            },
        });
        graph.add_pass(pass);

        let mut renderer = FakeRenderer::default();
        let mut cache = RenderTargetCache::new();
        let result = compile(&mut graph, &mut renderer, &mut cache);

        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn buffer_usage_mismatch_is_rejected() {
        let mut graph = RgGraph::new();
        let buffer = graph.declare_buffer(
            "b",
            BufferDesc {
                size: 64,
                usage_flags: BufferUsageFlags::VERTEX_BUFFER,
                flags: ResourceFlags::empty(),
            },
        );
        let mut pass = RgPass::new("p", PassType::Compute);
        pass.buffer_writes.push(BufferUse {
            handle: buffer,
            access: Access::StorageWrite,
        });
        graph.add_pass(pass);

        let mut renderer = FakeRenderer::default();
        let mut cache = RenderTargetCache::new();
        let result = compile(&mut graph, &mut renderer, &mut cache);

        assert!(matches!(result, Err(CoreError::UsageMismatch { .. })));
    }
}
