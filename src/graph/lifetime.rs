//! Resource lifetime analysis (spec §4.11): one walk over the compiled
//! execution order recording, per resource, the first and last pass
//! position that touches it — the span `realize` uses to decide which
//! physical allocations can alias.

use crate::graph::model::RgGraph;

/// Recompute `lifetime` on every declared image/buffer from
/// `graph.execution_order`. Resources touched by no kept pass keep the
/// default `(u32::MAX, 0)` empty span.
pub fn analyze_lifetimes(graph: &mut RgGraph) {
    for (_, image) in graph.images.iter_mut() {
        image.lifetime = (u32::MAX, 0);
    }
    for (_, buffer) in graph.buffers.iter_mut() {
        buffer.lifetime = (u32::MAX, 0);
    }

    for (position, &pass_idx) in graph.execution_order.iter().enumerate() {
        let position = position as u32;
        let uses = graph.passes[pass_idx].collect_uses();

        for use_ in &uses.images {
            if let Some(image) = graph.images.get_mut(use_.handle) {
                image.lifetime.0 = image.lifetime.0.min(position);
                image.lifetime.1 = image.lifetime.1.max(position);
            }
        }
        for use_ in &uses.buffers {
            if let Some(buffer) = graph.buffers.get_mut(use_.handle) {
                buffer.lifetime.0 = buffer.lifetime.0.min(position);
                buffer.lifetime.1 = buffer.lifetime.1.max(position);
            }
        }
    }
}
