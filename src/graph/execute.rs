//! Execution playback (spec §4.15): replays the compiled execution order,
//! applying synthesized barriers and driving `begin_renderpass`/
//! `end_renderpass` around each pass's user callback.

use crate::graph::model::{PhysicalHandle, RgGraph};
use crate::graph::renderer::RendererFacade;

fn physical_image<R: RendererFacade>(graph: &RgGraph, handle: crate::graph::handle::Handle, image_index: u32) -> Option<PhysicalHandle> {
    graph
        .images
        .get(handle)
        .and_then(|img| img.textures.get(image_index as usize).or_else(|| img.textures.first()))
        .copied()
}

fn physical_buffer(graph: &RgGraph, handle: crate::graph::handle::Handle, image_index: u32) -> Option<PhysicalHandle> {
    graph
        .buffers
        .get(handle)
        .and_then(|buf| buf.buffers.get(image_index as usize).or_else(|| buf.buffers.first()))
        .copied()
}

/// Run every kept pass in `graph.execution_order` against `renderer`:
/// apply its barriers, open/close its renderpass if graphics, and invoke
/// its user callback.
pub fn execute<R: RendererFacade>(graph: &mut RgGraph, renderer: &mut R) {
    let image_index = renderer.current_image_index();
    let execution_order = graph.execution_order.clone();

    for pass_idx in execution_order {
        let image_barriers = graph.passes[pass_idx].compiled.pre_image_barriers.clone();
        for barrier in image_barriers {
            if let Some(texture) = physical_image::<R>(graph, barrier.handle, image_index) {
                renderer.apply_image_barrier(texture, barrier);
            }
        }
        let buffer_barriers = graph.passes[pass_idx].compiled.pre_buffer_barriers.clone();
        for barrier in buffer_barriers {
            if let Some(buffer) = physical_buffer(graph, barrier.handle, image_index) {
                renderer.apply_buffer_barrier(buffer, barrier);
            }
        }

        let pass = &mut graph.passes[pass_idx];
        let is_graphics = pass.pass_type == crate::graph::model::PassType::Graphics;
        if is_graphics {
            if let (Some(renderpass), Some(&target)) = (
                pass.compiled.renderpass,
                pass.compiled
                    .render_targets
                    .get(image_index as usize)
                    .or_else(|| pass.compiled.render_targets.first()),
            ) {
                renderer.begin_renderpass(renderpass, target);
            }
        }

        if let Some(callback) = pass.execute_callback.as_mut() {
            callback(pass_idx);
        }

        if is_graphics && pass.compiled.renderpass.is_some() {
            renderer.end_renderpass();
        }
    }
}
