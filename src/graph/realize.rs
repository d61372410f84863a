//! Physical resource realization (spec §4.13): turns declared images/
//! buffers into renderer-backed handles, generalizing the teacher's
//! `BufferAllocator` first-fit/coalescing/growth bookkeeping from a single
//! shared buffer to per-resource owned arrays (one handle per swapchain
//! image when `PER_IMAGE` is set) plus imported/external refresh.

use crate::error::CoreError;
use crate::graph::model::{ImageKind, ImageUsageFlags, ResourceFlags, RgGraph};
use crate::graph::renderer::{MemoryKind, RendererFacade, TextureDesc};

fn bytes_per_pixel(format: &str) -> u64 {
    match format {
        "rgba8" | "rgba8_srgb" | "bgra8" | "bgra8_srgb" | "rg16float" | "depth24stencil8" => 4,
        "rgba16float" | "rgba16unorm" | "rg32float" | "depth32float" => 8,
        "rgba32float" => 16,
        "r8unorm" | "r8" => 1,
        "r16float" | "rg8" => 2,
        _ => 4,
    }
}

fn resolve_count<R: RendererFacade>(desc_flags: ResourceFlags, renderer: &R) -> u32 {
    if desc_flags.contains(ResourceFlags::PER_IMAGE) && renderer.window_attachment_count() > 0 {
        renderer.window_attachment_count()
    } else {
        1
    }
}

fn compute_bytes_per_texture(width: u32, height: u32, mip_levels: u32, layers: u32, samples: u32, format: &str, force_array: bool) -> u64 {
    let bpp = bytes_per_pixel(format);
    let mut total = 0u64;
    let mut w = width.max(1) as u64;
    let mut h = height.max(1) as u64;
    for _ in 0..mip_levels.max(1) {
        total += w * h * bpp;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    let array_layers = if force_array { layers.max(6) } else { layers.max(1) } as u64;
    total * array_layers * samples.max(1) as u64
}

fn release_images<R: RendererFacade>(renderer: &mut R, image: &mut crate::graph::model::RgImage) {
    for handle in image.textures.drain(..) {
        renderer.destroy_texture(handle);
    }
}

fn release_buffers<R: RendererFacade>(renderer: &mut R, buffer: &mut crate::graph::model::RgBuffer) {
    for handle in buffer.buffers.drain(..) {
        renderer.buffer_destroy(handle);
    }
}

fn create_one_texture<R: RendererFacade>(
    renderer: &mut R,
    desc: &crate::graph::model::ImageDesc,
) -> Option<crate::graph::model::PhysicalHandle> {
    let usage = desc.usage_flags;
    if desc.kind == ImageKind::Depth && usage.contains(ImageUsageFlags::SAMPLED) {
        if desc.flags.contains(ResourceFlags::FORCE_ARRAY) {
            renderer.create_sampled_depth_attachment_array(desc.width, desc.height, desc.layers.max(1))
        } else {
            renderer.create_sampled_depth_attachment(desc.width, desc.height)
        }
    } else if desc.kind == ImageKind::Depth {
        renderer.create_depth_attachment(desc.width, desc.height)
    } else {
        renderer.create_render_target_texture(&TextureDesc {
            format: desc.format.clone(),
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels,
            layers: desc.layers,
            samples: desc.samples,
        })
    }
}

/// Realize physical backing for every resource the kept passes reference.
/// Releases partially-allocated handles and returns
/// [`CoreError::BackendFailure`] on the first per-index failure (spec
/// §4.13 abort-on-failure policy).
pub fn realize_resources<R: RendererFacade>(graph: &mut RgGraph, renderer: &mut R) -> Result<(), CoreError> {
    let referenced: std::collections::HashSet<crate::graph::handle::Handle> = graph
        .execution_order
        .iter()
        .flat_map(|&idx| {
            let uses = graph.passes[idx].collect_uses();
            uses.images.into_iter().map(|u| u.handle)
        })
        .collect();
    let referenced_buffers: std::collections::HashSet<crate::graph::handle::Handle> = graph
        .execution_order
        .iter()
        .flat_map(|&idx| {
            let uses = graph.passes[idx].collect_uses();
            uses.buffers.into_iter().map(|u| u.handle)
        })
        .collect();

    let image_handles: Vec<crate::graph::handle::Handle> = graph.images.iter().map(|(h, _)| h).collect();
    for handle in image_handles {
        if !referenced.contains(&handle) {
            continue;
        }
        let count = resolve_count(graph.images.get(handle).unwrap().desc.flags, renderer);
        let image = graph.images.get_mut(handle).unwrap();

        if let Some(imported) = image.imported {
            image.textures.clear();
            if image.kind == ImageKind::Depth {
                if let Some(h) = renderer.depth_attachment_get() {
                    image.textures.push(h);
                }
            } else {
                for i in 0..renderer.window_attachment_count().max(1) {
                    if let Some(h) = renderer.window_attachment_get(i) {
                        image.textures.push(h);
                    }
                }
            }
            image.current_layout = imported.layout;
            image.current_access = imported.access;
            continue;
        }

        let needs_recreate = image.textures.len() as u32 != count;
        if needs_recreate {
            release_images(renderer, image);
            let mut created = Vec::with_capacity(count as usize);
            let mut failed = false;
            for _ in 0..count {
                match create_one_texture(renderer, &image.desc) {
                    Some(h) => created.push(h),
                    None => {
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                for h in created {
                    renderer.destroy_texture(h);
                }
                return Err(CoreError::BackendFailure(format!("failed to allocate texture for '{}'", image.name)));
            }
            image.bytes_per_texture = compute_bytes_per_texture(
                image.desc.width,
                image.desc.height,
                image.desc.mip_levels,
                image.desc.layers,
                image.desc.samples,
                &image.desc.format,
                image.desc.flags.contains(ResourceFlags::FORCE_ARRAY),
            );
            image.textures = created;
            image.texture_generation += 1;
            graph.bytes_allocated += image.bytes_per_texture * count as u64;
        } else if image.desc.flags.contains(ResourceFlags::RESIZABLE) {
            for &tex in &image.textures {
                if !renderer.resize_texture(tex, image.desc.width, image.desc.height, true) {
                    return Err(CoreError::BackendFailure(format!("failed to resize texture for '{}'", image.name)));
                }
            }
            let new_bytes = compute_bytes_per_texture(
                image.desc.width,
                image.desc.height,
                image.desc.mip_levels,
                image.desc.layers,
                image.desc.samples,
                &image.desc.format,
                image.desc.flags.contains(ResourceFlags::FORCE_ARRAY),
            );
            let delta = new_bytes as i64 - image.bytes_per_texture as i64;
            image.bytes_per_texture = new_bytes;
            graph.bytes_allocated = (graph.bytes_allocated as i64 + delta * count as i64).max(0) as u64;
        }
    }

    let buffer_handles: Vec<crate::graph::handle::Handle> = graph.buffers.iter().map(|(h, _)| h).collect();
    for handle in buffer_handles {
        if !referenced_buffers.contains(&handle) {
            continue;
        }
        let count = resolve_count(graph.buffers.get(handle).unwrap().desc.flags, renderer);
        let buffer = graph.buffers.get_mut(handle).unwrap();
        if buffer.imported.is_some() {
            continue;
        }
        if buffer.buffers.len() as u32 == count {
            continue;
        }
        release_buffers(renderer, buffer);
        let memory_kind = if buffer.desc.usage_flags.contains(crate::graph::model::BufferUsageFlags::UNIFORM) {
            MemoryKind::HostVisibleCoherent
        } else {
            MemoryKind::DeviceLocal
        };
        let mut created = Vec::with_capacity(count as usize);
        let mut failed = false;
        for _ in 0..count {
            match renderer.buffer_create(buffer.desc.size, memory_kind, None) {
                Some(h) => created.push(h),
                None => {
                    failed = true;
                    break;
                }
            }
        }
        if failed {
            for h in created {
                renderer.buffer_destroy(h);
            }
            return Err(CoreError::BackendFailure(format!("failed to allocate buffer for '{}'", buffer.name)));
        }
        graph.bytes_allocated += buffer.desc.size * count as u64;
        buffer.buffers = created;
    }

    Ok(())
}
