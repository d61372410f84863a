use vkr_core::freelist::FreeList;
use vkr_core::graph::{
    Access, Attachment, BufferDesc, BufferUsageFlags, BufferUse, ImageDesc, ImageKind, ImageLayout, ImageSlice, ImageUsageFlags,
    ImageUse, LoadOp, MemoryKind, PassType, PhysicalHandle, RenderPassDesc, RenderTargetCache, RenderTargetDesc, RendererFacade,
    ResourceFlags, RgGraph, RgPass, StoreOp, TextureDesc,
};
use vkr_core::CoreError;

#[derive(Default)]
struct FakeRenderer {
    next_handle: u64,
    resize_calls: u32,
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
        self.resize_calls += 1;
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
    fn apply_image_barrier(&mut self, _texture: PhysicalHandle, _barrier: vkr_core::graph::PreImageBarrier) {}
    fn apply_buffer_barrier(&mut self, _buffer: PhysicalHandle, _barrier: vkr_core::graph::PreBufferBarrier) {}
    fn wait_idle(&mut self) {}
    fn get_error_string(&self, _code: i32) -> String {
        String::new()
    }
}

fn full_slice() -> ImageSlice {
    ImageSlice {
        mip: 0,
        base_layer: 0,
        layer_count: 1,
    }
}

#[test]
fn single_image_triangle_compiles_with_one_pass() {
    let mut graph = RgGraph::new();
    let swapchain = graph.declare_image(
        "swapchain",
        ImageDesc {
            format: "bgra8".into(),
            width: 1920,
            height: 1080,
            mip_levels: 1,
            layers: 1,
            samples: 1,
            kind: ImageKind::Color,
            usage_flags: ImageUsageFlags::COLOR_ATTACHMENT,
            flags: ResourceFlags::PER_IMAGE,
        },
    );

    let mut triangle = RgPass::new("Triangle", PassType::Graphics);
    triangle.color_attachments.push(Attachment {
        image: swapchain,
        load_op: LoadOp::Clear,
        store_op: StoreOp::Store,
        clear_value: [0.0, 0.0, 0.0, 1.0],
        slice: full_slice(),
    });
    graph.add_pass(triangle);
    graph.present_image = Some(swapchain);

    let mut renderer = FakeRenderer::default();
    let mut cache = RenderTargetCache::new();
    vkr_core::graph::compile(&mut graph, &mut renderer, &mut cache).unwrap();

    assert_eq!(graph.execution_order, vec![0]);
    let barriers = &graph.passes[0].compiled.pre_image_barriers;
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].src_layout, ImageLayout::Undefined);
    assert_eq!(barriers[0].dst_layout, ImageLayout::ColorAttachmentOptimal);
}

#[test]
fn depth_prepass_then_forward_orders_and_barriers_correctly() {
    let mut graph = RgGraph::new();
    let depth = graph.declare_image(
        "scene_depth",
        ImageDesc {
            format: "depth32float".into(),
            width: 1920,
            height: 1080,
            mip_levels: 1,
            layers: 1,
            samples: 1,
            kind: ImageKind::Depth,
            usage_flags: ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | ImageUsageFlags::SAMPLED,
            flags: ResourceFlags::empty(),
        },
    );
    let color = graph.declare_image(
        "scene_color",
        ImageDesc {
            format: "rgba16float".into(),
            width: 1920,
            height: 1080,
            mip_levels: 1,
            layers: 1,
            samples: 1,
            kind: ImageKind::Color,
            usage_flags: ImageUsageFlags::COLOR_ATTACHMENT,
            flags: ResourceFlags::empty(),
        },
    );

    let mut pass_a = RgPass::new("DepthPrepass", PassType::Graphics);
    pass_a.depth_attachment = Some(Attachment {
        image: depth,
        load_op: LoadOp::Clear,
        store_op: StoreOp::Store,
        clear_value: [1.0, 0.0, 0.0, 0.0],
        slice: full_slice(),
    });
    graph.add_pass(pass_a);

    let mut pass_b = RgPass::new("Forward", PassType::Graphics);
    pass_b.image_reads.push(ImageUse {
        handle: depth,
        access: Access::DepthReadOnly,
    });
    pass_b.color_attachments.push(Attachment {
        image: color,
        load_op: LoadOp::Clear,
        store_op: StoreOp::Store,
        clear_value: [0.0; 4],
        slice: full_slice(),
    });
    graph.add_pass(pass_b);
    graph.export_images.push(color);

    let mut renderer = FakeRenderer::default();
    let mut cache = RenderTargetCache::new();
    vkr_core::graph::compile(&mut graph, &mut renderer, &mut cache).unwrap();

    assert_eq!(graph.execution_order, vec![0, 1]);
    let depth_idx = graph.execution_order.iter().position(|&i| i == 0).unwrap();
    let forward_idx = graph.execution_order.iter().position(|&i| i == 1).unwrap();
    assert!(depth_idx < forward_idx);

    let pre_a = &graph.passes[0].compiled.pre_image_barriers;
    assert_eq!(pre_a[0].src_layout, ImageLayout::Undefined);
    assert_eq!(pre_a[0].dst_layout, ImageLayout::DepthStencilAttachmentOptimal);

    let pre_b = &graph.passes[1].compiled.pre_image_barriers;
    let depth_barrier = pre_b.iter().find(|b| b.handle == depth).unwrap();
    assert_eq!(depth_barrier.src_layout, ImageLayout::DepthStencilAttachmentOptimal);
    assert_eq!(depth_barrier.dst_layout, ImageLayout::DepthStencilReadOnlyOptimal);
}

#[test]
fn unused_pass_without_no_cull_is_excluded() {
    let mut graph = RgGraph::new();
    let kept_buf = graph.declare_buffer(
        "kept",
        BufferDesc {
            size: 256,
            usage_flags: BufferUsageFlags::STORAGE,
            flags: ResourceFlags::empty(),
        },
    );
    let orphan_buf = graph.declare_buffer(
        "orphan",
        BufferDesc {
            size: 256,
            usage_flags: BufferUsageFlags::STORAGE,
            flags: ResourceFlags::empty(),
        },
    );

    let mut kept = RgPass::new("Kept", PassType::Compute);
    kept.buffer_writes.push(BufferUse {
        handle: kept_buf,
        access: Access::StorageWrite,
    });
    graph.add_pass(kept);

    let mut unused = RgPass::new("Unused", PassType::Compute);
    unused.buffer_writes.push(BufferUse {
        handle: orphan_buf,
        access: Access::StorageWrite,
    });
    graph.add_pass(unused);

    graph.export_buffers.push(kept_buf);

    let mut renderer = FakeRenderer::default();
    let mut cache = RenderTargetCache::new();
    vkr_core::graph::compile(&mut graph, &mut renderer, &mut cache).unwrap();

    assert_eq!(graph.execution_order, vec![0]);
    assert!(graph.passes[1].compiled.culled);
}

#[test]
fn mutual_dependency_cycle_fails_compile() {
    // Two passes with no resource uses of their own, wired into a direct
    // cycle on the compiled edge lists: the only way to get a genuine A<->B
    // cycle, since a single forward declaration sweep can never produce one
    // from `image_reads`/`image_writes` alone (every edge it adds points
    // from an earlier-declared pass to a later one).
    let mut graph = RgGraph::new();
    graph.add_pass(RgPass::new("A", PassType::Compute));
    graph.add_pass(RgPass::new("B", PassType::Compute));
    graph.passes[0].compiled.out_edges.push(1);
    graph.passes[1].compiled.in_edges.push(0);
    graph.passes[1].compiled.out_edges.push(0);
    graph.passes[0].compiled.in_edges.push(1);

    let mut renderer = FakeRenderer::default();
    let mut cache = RenderTargetCache::new();
    let result = vkr_core::graph::compile(&mut graph, &mut renderer, &mut cache);

    assert!(matches!(result, Err(CoreError::DependencyCycle)));
}

#[test]
fn freelist_stress_round_trips_to_a_single_span() {
    let mut list = FreeList::create(2048, 16).unwrap();
    let a = list.allocate(256).unwrap();
    let b = list.allocate(512).unwrap();
    let c = list.allocate(128).unwrap();
    let d = list.allocate(256).unwrap();

    assert_eq!((a, b, c, d), (0, 256, 768, 896));

    assert!(list.free(256, d));
    assert!(list.free(256, a));
    assert!(list.free(512, b));
    assert!(list.free(128, c));

    assert_eq!(list.free_space(), 2048);
}
