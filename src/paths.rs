//! Shortest-path counts, pushed down the DAG one finalized node at a time.
//!
//! A node's count is final once every predecessor has pushed into it. A
//! finalized node with successors pushes its count to each DAG successor
//! exactly once, adding one to the successor's `trim`. The changes pass then
//! retires trimmed predecessors and folds `to_add` into the count.

use crate::bc::{converge, PhaseStats, SourceContext};
use crate::error::{Error, Result};
use crate::exec::Executor;
use crate::graph::{PartitionedGraph, Reduce, Role};
use crate::net::DistAccumulator;
use crate::sync::{NumShortestPaths, PathsReady, ToAdd, Trim};
use crate::types::LocalId;
use std::sync::atomic::Ordering;
use tracing::debug;

fn push<G: PartitionedGraph>(graph: &G, lid: LocalId, work: &DistAccumulator) {
    let data = graph.data(lid);
    if !data.reached()
        || !data.paths_ready.load(Ordering::Relaxed)
        || data.num_successors.load(Ordering::Relaxed) == 0
    {
        return;
    }

    let bitsets = graph.bitsets();
    let paths = data.num_shortest_paths.load(Ordering::Relaxed);
    let next = data.distance() + 1;
    for &dst in graph.edges(lid) {
        let head = graph.data(dst);
        if head.distance() == next {
            head.to_add.fetch_add(paths, Ordering::Relaxed);
            head.trim.fetch_add(1, Ordering::Relaxed);
            bitsets.to_add.set(dst);
            bitsets.trim.set(dst);
            work.add(1);
        }
    }
    data.paths_ready.store(false, Ordering::Relaxed);
    bitsets.paths_ready.set(lid);
}

fn apply_changes<G: PartitionedGraph>(graph: &G, lid: LocalId) -> Result<()> {
    let data = graph.data(lid);
    let bitsets = graph.bitsets();

    let trim = data.trim.swap(0, Ordering::Relaxed);
    if trim > 0 {
        let predecessors = data.num_predecessors.load(Ordering::Relaxed);
        if trim > predecessors {
            return Err(Error::InvariantViolation {
                node: graph.global_id(lid),
                field: "num_predecessors",
                trim,
                count: predecessors,
            });
        }
        data.num_predecessors.store(predecessors - trim, Ordering::Relaxed);
        if predecessors == trim {
            data.paths_ready.store(true, Ordering::Relaxed);
            bitsets.paths_ready.set(lid);
        }
    }

    let to_add = data.to_add.swap(0, Ordering::Relaxed);
    if to_add > 0 {
        data.num_shortest_paths.fetch_add(to_add, Ordering::Relaxed);
        bitsets.num_shortest_paths.set(lid);
    }
    Ok(())
}

pub fn run<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) -> Result<PhaseStats> {
    let graph = ctx.graph;
    let filter = ctx.filter();
    let work = DistAccumulator::new();

    let stats = converge(ctx, "paths", || {
        work.reset();
        ctx.exec.for_each(0..graph.num_local(), |lid| push(graph, lid, &work));
        graph.sync::<Trim>(Role::Destination, Role::Source, Reduce::Add, filter)?;
        graph.sync::<ToAdd>(Role::Destination, Role::Source, Reduce::Add, filter)?;
        ctx.exec.try_for_each(0..graph.num_local(), |lid| apply_changes(graph, lid))?;
        work.reduce(graph.transport(), "paths/work")
    })?;

    // Successors read the final counts at their edge heads.
    graph.sync::<NumShortestPaths>(Role::Source, Role::Destination, Reduce::Overwrite, filter)?;
    graph.sync::<PathsReady>(Role::Source, Role::Destination, Reduce::Overwrite, filter)?;

    debug!(host = graph.host_id(), source = ctx.source, rounds = stats.rounds, "paths counted");
    Ok(stats)
}
