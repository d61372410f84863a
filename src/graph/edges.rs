//! Dependency edge construction (spec §4.8): a single forward sweep over
//! declared passes tracking, per resource, the last writer and the set of
//! readers since that writer, wiring `out_edges`/`in_edges` as it goes.

use crate::graph::handle::Handle;
use crate::graph::model::{ResourceFlags, RgGraph};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct ResourceState {
    last_writer: Option<usize>,
    last_readers: HashSet<usize>,
}

fn add_edge(graph: &mut RgGraph, from: usize, to: usize, seen: &mut HashSet<(usize, usize)>) {
    if from == to || !seen.insert((from, to)) {
        return;
    }
    graph.passes[from].compiled.out_edges.push(to);
    graph.passes[to].compiled.in_edges.push(from);
}

/// Build `out_edges`/`in_edges` on every pass from the declared
/// reads/writes, in declaration order. Warns (does not fail) on a resource
/// read before any writer unless it is imported, `PERSISTENT`, or
/// `EXTERNAL`.
pub fn build_dependency_edges(graph: &mut RgGraph) {
    let mut image_state: HashMap<Handle, ResourceState> = HashMap::new();
    let mut buffer_state: HashMap<Handle, ResourceState> = HashMap::new();
    let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();

    for pass_idx in 0..graph.passes.len() {
        let uses = graph.passes[pass_idx].collect_uses();

        for use_ in &uses.images {
            let state = image_state.entry(use_.handle).or_default();
            if use_.is_write {
                if let Some(writer) = state.last_writer {
                    add_edge(graph, writer, pass_idx, &mut seen_edges);
                }
                for &reader in &state.last_readers {
                    add_edge(graph, reader, pass_idx, &mut seen_edges);
                }
                state.last_readers.clear();
                state.last_writer = Some(pass_idx);
            } else {
                if let Some(writer) = state.last_writer {
                    add_edge(graph, writer, pass_idx, &mut seen_edges);
                } else {
                    let imported_or_retained = graph
                        .images
                        .get(use_.handle)
                        .is_some_and(|img| img.imported.is_some() || img.desc.flags.intersects(ResourceFlags::PERSISTENT | ResourceFlags::EXTERNAL));
                    if !imported_or_retained {
                        log::warn!(
                            "render graph: pass '{}' reads resource before any writer",
                            graph.passes[pass_idx].name
                        );
                    }
                }
                state.last_readers.insert(pass_idx);
            }
        }

        for use_ in &uses.buffers {
            let state = buffer_state.entry(use_.handle).or_default();
            if use_.is_write {
                if let Some(writer) = state.last_writer {
                    add_edge(graph, writer, pass_idx, &mut seen_edges);
                }
                for &reader in &state.last_readers {
                    add_edge(graph, reader, pass_idx, &mut seen_edges);
                }
                state.last_readers.clear();
                state.last_writer = Some(pass_idx);
            } else {
                if let Some(writer) = state.last_writer {
                    add_edge(graph, writer, pass_idx, &mut seen_edges);
                } else {
                    let imported_or_retained = graph
                        .buffers
                        .get(use_.handle)
                        .is_some_and(|buf| buf.imported.is_some() || buf.desc.flags.intersects(ResourceFlags::PERSISTENT | ResourceFlags::EXTERNAL));
                    if !imported_or_retained {
                        log::warn!(
                            "render graph: pass '{}' reads buffer before any writer",
                            graph.passes[pass_idx].name
                        );
                    }
                }
                state.last_readers.insert(pass_idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{Access, BufferDesc, BufferUsageFlags, BufferUse, PassType, RgPass};

    #[test]
    fn write_then_read_creates_edge() {
        let mut graph = RgGraph::new();
        let buf = graph.declare_buffer(
            "b",
            BufferDesc {
                size: 64,
                usage_flags: BufferUsageFlags::STORAGE,
                flags: ResourceFlags::empty(),
            },
        );

        let mut writer = RgPass::new("writer", PassType::Compute);
        writer.buffer_writes.push(BufferUse {
            handle: buf,
            access: Access::StorageWrite,
        });
        graph.add_pass(writer);

        let mut reader = RgPass::new("reader", PassType::Compute);
        reader.buffer_reads.push(BufferUse {
            handle: buf,
            access: Access::StorageRead,
        });
        graph.add_pass(reader);

        build_dependency_edges(&mut graph);

        assert_eq!(graph.passes[0].compiled.out_edges, vec![1]);
        assert_eq!(graph.passes[1].compiled.in_edges, vec![0]);
    }

    #[test]
    fn second_writer_depends_on_prior_readers() {
        let mut graph = RgGraph::new();
        let buf = graph.declare_buffer(
            "b",
            BufferDesc {
                size: 64,
                usage_flags: BufferUsageFlags::STORAGE,
                flags: ResourceFlags::empty(),
            },
        );

        let mut writer1 = RgPass::new("w1", PassType::Compute);
        writer1.buffer_writes.push(BufferUse {
            handle: buf,
            access: Access::StorageWrite,
        });
        graph.add_pass(writer1);

        let mut reader = RgPass::new("r", PassType::Compute);
        reader.buffer_reads.push(BufferUse {
            handle: buf,
            access: Access::StorageRead,
        });
        graph.add_pass(reader);

        let mut writer2 = RgPass::new("w2", PassType::Compute);
        writer2.buffer_writes.push(BufferUse {
            handle: buf,
            access: Access::StorageWrite,
        });
        graph.add_pass(writer2);

        build_dependency_edges(&mut graph);

        assert_eq!(graph.passes[1].compiled.out_edges, vec![2]);
        assert!(graph.passes[2].compiled.in_edges.contains(&0) || graph.passes[2].compiled.in_edges.contains(&1));
    }
}
