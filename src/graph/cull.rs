//! Dead-pass culling (spec §4.9): a reverse walk from the passes that
//! matter — present/export writers and anything flagged `NO_CULL` — over
//! `in_edges`, marking everything it can reach as kept. Everything else,
//! and anything flagged `DISABLED`, is culled.

use crate::graph::handle::Handle;
use crate::graph::model::RgGraph;
use std::collections::{HashSet, VecDeque};

/// Mark `compiled.culled` on every pass. Must run after
/// [`crate::graph::edges::build_dependency_edges`] has populated `in_edges`.
pub fn cull_dead_passes(graph: &mut RgGraph) {
    let outputs: HashSet<Handle> = graph
        .present_image
        .into_iter()
        .chain(graph.export_images.iter().copied())
        .collect();
    let buffer_outputs: HashSet<Handle> = graph.export_buffers.iter().copied().collect();

    if outputs.is_empty() && buffer_outputs.is_empty() {
        for pass in &mut graph.passes {
            pass.compiled.culled = pass.is_disabled();
        }
        return;
    }

    let mut keep = vec![false; graph.passes.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for (idx, pass) in graph.passes.iter().enumerate() {
        if pass.is_disabled() {
            continue;
        }
        let writes_output = pass.written_images().iter().any(|h| outputs.contains(h))
            || pass.written_buffers().iter().any(|h| buffer_outputs.contains(h));
        if pass.is_no_cull() || writes_output {
            keep[idx] = true;
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let in_edges = graph.passes[idx].compiled.in_edges.clone();
        for upstream in in_edges {
            if !keep[upstream] {
                keep[upstream] = true;
                queue.push_back(upstream);
            }
        }
    }

    for (idx, pass) in graph.passes.iter_mut().enumerate() {
        pass.compiled.culled = pass.is_disabled() || !keep[idx];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edges::build_dependency_edges;
    use crate::graph::model::{
        Access, BufferDesc, BufferUsageFlags, BufferUse, PassFlags, PassType, ResourceFlags, RgPass,
    };

    #[test]
    fn pass_with_no_path_to_any_output_is_culled() {
        let mut graph = RgGraph::new();
        let present = graph.declare_buffer(
            "present",
            BufferDesc {
                size: 64,
                usage_flags: BufferUsageFlags::STORAGE,
                flags: ResourceFlags::empty(),
            },
        );
        let orphan = graph.declare_buffer(
            "orphan",
            BufferDesc {
                size: 64,
                usage_flags: BufferUsageFlags::STORAGE,
                flags: ResourceFlags::empty(),
            },
        );

        let mut writer = RgPass::new("writer", PassType::Compute);
        writer.buffer_writes.push(BufferUse {
            handle: present,
            access: Access::StorageWrite,
        });
        graph.add_pass(writer);

        let mut dead = RgPass::new("dead", PassType::Compute);
        dead.buffer_writes.push(BufferUse {
            handle: orphan,
            access: Access::StorageWrite,
        });
        graph.add_pass(dead);

        graph.export_buffers.push(present);
        build_dependency_edges(&mut graph);
        cull_dead_passes(&mut graph);

        assert!(!graph.passes[0].compiled.culled);
        assert!(graph.passes[1].compiled.culled);
    }

    #[test]
    fn no_cull_flag_survives_without_any_output() {
        let mut graph = RgGraph::new();
        let mut pass = RgPass::new("debug-overlay", PassType::Compute);
        pass.flags = PassFlags::NO_CULL;
        graph.add_pass(pass);

        build_dependency_edges(&mut graph);
        cull_dead_passes(&mut graph);

        assert!(!graph.passes[0].compiled.culled);
    }

    #[test]
    fn empty_output_set_keeps_every_enabled_pass() {
        let mut graph = RgGraph::new();
        graph.add_pass(RgPass::new("a", PassType::Compute));
        graph.add_pass(RgPass::new("b", PassType::Compute));

        build_dependency_edges(&mut graph);
        cull_dead_passes(&mut graph);

        assert!(!graph.passes[0].compiled.culled);
        assert!(!graph.passes[1].compiled.culled);
    }
}
