//! Renderpass & render-target cache (spec §4.14): pass-keyed storage of the
//! concrete renderpass and per-image-index render target, invalidated by an
//! FNV-like content hash the way the teacher's `RenderCache::get_or_create`
//! keys on (and GC's by) a generation counter rather than rebuilding eagerly.

use crate::error::CoreError;
use crate::graph::handle::HandleTable;
use crate::graph::model::{Attachment, PhysicalHandle, RgImage, RgPass};
use crate::graph::renderer::{RenderPassAttachmentDesc, RenderPassDesc, RenderTargetDesc, RendererFacade};
use std::collections::HashMap;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 1_099_511_628_211;

fn fnv_mix(hash: u64, bytes: &[u8]) -> u64 {
    let mut h = hash;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

fn hash_attachment(hash: u64, attachment: &Attachment, format_hash: u64, samples: u32) -> u64 {
    let mut h = fnv_mix(hash, &format_hash.to_le_bytes());
    h = fnv_mix(h, &(attachment.load_op as u32).to_le_bytes());
    h = fnv_mix(h, &(attachment.store_op as u32).to_le_bytes());
    for component in attachment.clear_value {
        h = fnv_mix(h, &component.to_bits().to_le_bytes());
    }
    fnv_mix(h, &samples.to_le_bytes())
}

fn format_hash_of(images: &HandleTable<RgImage>, image: crate::graph::handle::Handle) -> (u64, u32) {
    match images.get(image) {
        Some(img) => (fnv_mix(FNV_OFFSET, img.desc.format.as_bytes()), img.desc.samples),
        None => (0, 1),
    }
}

fn renderpass_hash(images: &HandleTable<RgImage>, pass: &RgPass) -> u64 {
    let mut h = FNV_OFFSET;
    for attachment in &pass.color_attachments {
        let (format_hash, samples) = format_hash_of(images, attachment.image);
        h = hash_attachment(h, attachment, format_hash, samples);
    }
    if let Some(attachment) = &pass.depth_attachment {
        let (format_hash, samples) = format_hash_of(images, attachment.image);
        h = hash_attachment(h, attachment, format_hash, samples);
    }
    h
}

fn target_hash(images: &HandleTable<RgImage>, pass: &RgPass, renderpass_hash: u64, image_index: u32) -> u64 {
    let mut h = fnv_mix(FNV_OFFSET, &renderpass_hash.to_le_bytes());
    h = fnv_mix(h, &pass.compiled.render_target_count.to_le_bytes());

    let mut attach = |h: u64, image: crate::graph::handle::Handle| -> u64 {
        let texture = images
            .get(image)
            .and_then(|img| img.textures.get(image_index as usize).or_else(|| img.textures.first()))
            .copied()
            .unwrap_or(PhysicalHandle(0));
        let mut h = fnv_mix(h, &texture.0.to_le_bytes());
        if let Some(img) = images.get(image) {
            h = fnv_mix(h, &img.desc.width.to_le_bytes());
            h = fnv_mix(h, &img.desc.height.to_le_bytes());
        }
        h
    };

    for attachment in &pass.color_attachments {
        h = attach(h, attachment.image);
    }
    if let Some(attachment) = &pass.depth_attachment {
        h = attach(h, attachment.image);
    }
    h
}

struct CacheEntry {
    renderpass_hash: u64,
    renderpass: PhysicalHandle,
    target_hash: u64,
    target_count: u32,
    targets: Vec<PhysicalHandle>,
    last_used_frame: u64,
}

/// Pass-keyed cache of renderpasses and their per-image-index render
/// targets. Stale entries (not touched for `gc_after_frames` frames) are
/// reclaimed by [`RenderTargetCache::gc`].
#[derive(Default)]
pub struct RenderTargetCache {
    entries: HashMap<String, CacheEntry>,
    frame: u64,
}

impl RenderTargetCache {
    pub fn new() -> RenderTargetCache {
        RenderTargetCache::default()
    }

    pub fn begin_frame(&mut self) {
        self.frame += 1;
    }

    /// Build or refresh the renderpass and render targets for a graphics
    /// pass, storing the resulting handles on `pass.compiled`.
    pub fn get_or_create<R: RendererFacade>(&mut self, images: &HandleTable<RgImage>, pass: &mut RgPass, renderer: &mut R) -> Result<(), CoreError> {
        let rp_hash = renderpass_hash(images, pass);
        let entry_exists = self.entries.contains_key(&pass.name);

        if !entry_exists || self.entries[&pass.name].renderpass_hash != rp_hash {
            if entry_exists {
                renderer.wait_idle();
                let old = self.entries.remove(&pass.name).unwrap();
                renderer.renderpass_destroy(old.renderpass);
                for target in old.targets {
                    renderer.render_target_destroy(target);
                }
            }

            let desc = RenderPassDesc {
                color_attachments: pass
                    .color_attachments
                    .iter()
                    .map(|a| {
                        let (format_hash, samples) = format_hash_of(images, a.image);
                        RenderPassAttachmentDesc {
                            format_hash,
                            load_op: a.load_op,
                            store_op: a.store_op,
                            clear_value: a.clear_value,
                            samples,
                        }
                    })
                    .collect(),
                depth_attachment: pass.depth_attachment.as_ref().map(|a| {
                    let (format_hash, samples) = format_hash_of(images, a.image);
                    RenderPassAttachmentDesc {
                        format_hash,
                        load_op: a.load_op,
                        store_op: a.store_op,
                        clear_value: a.clear_value,
                        samples,
                    }
                }),
            };
            let renderpass = renderer
                .renderpass_create_desc(&desc)
                .ok_or_else(|| CoreError::BackendFailure(format!("renderpass creation failed for pass '{}'", pass.name)))?;

            self.entries.insert(
                pass.name.clone(),
                CacheEntry {
                    renderpass_hash: rp_hash,
                    renderpass,
                    target_hash: u64::MAX,
                    target_count: 0,
                    targets: Vec::new(),
                    last_used_frame: self.frame,
                },
            );
        }

        let image_count = renderer.window_attachment_count().max(1);
        let t_hash = target_hash(images, pass, rp_hash, 0);
        let needs_target_rebuild = self.entries[&pass.name].target_hash != t_hash || self.entries[&pass.name].target_count != image_count;

        if needs_target_rebuild {
            let renderpass = self.entries[&pass.name].renderpass;
            let old_targets = std::mem::take(&mut self.entries.get_mut(&pass.name).unwrap().targets);
            for target in old_targets {
                renderer.render_target_destroy(target);
            }

            let mut new_targets = Vec::with_capacity(image_count as usize);
            for image_index in 0..image_count {
                let attachments: Vec<PhysicalHandle> = pass
                    .color_attachments
                    .iter()
                    .map(|a| image_texture(images, a.image, image_index))
                    .chain(pass.depth_attachment.iter().map(|a| image_texture(images, a.image, image_index)))
                    .collect();
                let extent = pass
                    .color_attachments
                    .first()
                    .or(pass.depth_attachment.as_ref())
                    .and_then(|a| images.get(a.image))
                    .map(|img| (img.desc.width, img.desc.height))
                    .unwrap_or((0, 0));
                let target = renderer
                    .render_target_create(&RenderTargetDesc {
                        renderpass,
                        attachments,
                        extent,
                    })
                    .ok_or_else(|| CoreError::BackendFailure(format!("render target creation failed for pass '{}'", pass.name)))?;
                new_targets.push(target);
            }

            let entry = self.entries.get_mut(&pass.name).unwrap();
            entry.targets = new_targets;
            entry.target_hash = t_hash;
            entry.target_count = image_count;
        }

        let entry = self.entries.get_mut(&pass.name).unwrap();
        entry.last_used_frame = self.frame;
        pass.compiled.renderpass = Some(entry.renderpass);
        pass.compiled.render_targets = entry.targets.clone();
        pass.compiled.render_target_count = entry.target_count;
        Ok(())
    }

    /// Destroy cache entries for passes untouched for `max_age` frames.
    pub fn gc<R: RendererFacade>(&mut self, max_age: u64, renderer: &mut R) {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.frame.saturating_sub(entry.last_used_frame) > max_age)
            .map(|(name, _)| name.clone())
            .collect();
        for name in stale {
            if let Some(entry) = self.entries.remove(&name) {
                renderer.wait_idle();
                renderer.renderpass_destroy(entry.renderpass);
                for target in entry.targets {
                    renderer.render_target_destroy(target);
                }
            }
        }
    }
}

fn image_texture(images: &HandleTable<RgImage>, image: crate::graph::handle::Handle, image_index: u32) -> PhysicalHandle {
    images
        .get(image)
        .and_then(|img| img.textures.get(image_index as usize).or_else(|| img.textures.first()))
        .copied()
        .unwrap_or(PhysicalHandle(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::RgGraph;

    #[test]
    fn identical_attachments_hash_equal() {
        let mut graph = RgGraph::new();
        let img = graph.declare_image(
            "a",
            crate::graph::model::ImageDesc {
                format: "rgba8".into(),
                width: 64,
                height: 64,
                mip_levels: 1,
                layers: 1,
                samples: 1,
                kind: crate::graph::model::ImageKind::Color,
                usage_flags: crate::graph::model::ImageUsageFlags::COLOR_ATTACHMENT,
                flags: crate::graph::model::ResourceFlags::empty(),
            },
        );
        let mut pass = RgPass::new("p", crate::graph::model::PassType::Graphics);
        pass.color_attachments.push(Attachment {
            image: img,
            load_op: crate::graph::model::LoadOp::Clear,
            store_op: crate::graph::model::StoreOp::Store,
            clear_value: [0.0; 4],
            slice: crate::graph::model::ImageSlice {
                mip: 0,
                base_layer: 0,
                layer_count: 1,
            },
        });

        let h1 = renderpass_hash(&graph.images, &pass);
        let h2 = renderpass_hash(&graph.images, &pass);
        assert_eq!(h1, h2);
    }
}
