//! Execution ordering (spec §4.10): Kahn's algorithm over the kept passes,
//! the same queue-draining shape as the teacher's `topo_sort` over
//! `RenderGraphNode`s, restricted here to edges between two kept passes.

use crate::graph::model::RgGraph;
use crate::error::CoreError;
use std::collections::VecDeque;

/// Compute `graph.execution_order` from the kept (non-culled) passes and
/// their edges. Returns [`CoreError::DependencyCycle`] if a cycle prevents
/// every kept pass from being scheduled.
pub fn topological_sort(graph: &mut RgGraph) -> Result<(), CoreError> {
    let kept: Vec<usize> = (0..graph.passes.len()).filter(|&i| !graph.passes[i].compiled.culled).collect();

    let mut in_degree = vec![0usize; graph.passes.len()];
    for &idx in &kept {
        let degree = graph.passes[idx]
            .compiled
            .in_edges
            .iter()
            .filter(|&&from| !graph.passes[from].compiled.culled)
            .count();
        in_degree[idx] = degree;
    }

    let mut queue: VecDeque<usize> = kept.iter().copied().filter(|&idx| in_degree[idx] == 0).collect();
    let mut order = Vec::with_capacity(kept.len());

    while let Some(idx) = queue.pop_front() {
        order.push(idx);
        let out_edges = graph.passes[idx].compiled.out_edges.clone();
        for to in out_edges {
            if graph.passes[to].compiled.culled {
                continue;
            }
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                queue.push_back(to);
            }
        }
    }

    if order.len() != kept.len() {
        return Err(CoreError::DependencyCycle);
    }

    graph.execution_order = order;
    Ok(())
}
