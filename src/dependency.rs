//! Brandes dependency accumulation, pulled up the DAG from its sinks.
//!
//! A node's dependency is final once every DAG successor has reported. Sinks
//! start out final. Each round, every node with outstanding successors pulls
//! from the successors that became final since its last pull, and the changes
//! pass retires those successors. A final node whose successors have all been
//! consumed clears its flag and zeroes its path count, so nobody pulls from it
//! twice. The source takes no dependency from its own run.

use crate::bc::{converge, PhaseStats, SourceContext};
use crate::error::{Error, Result};
use crate::exec::Executor;
use crate::graph::{PartitionedGraph, Reduce, Role};
use crate::net::DistAccumulator;
use crate::sync::{Dependency, DependencyReady, ToAddFloat, Trim};
use crate::types::LocalId;
use std::sync::atomic::Ordering;
use tracing::debug;

fn pull<G: PartitionedGraph>(graph: &G, lid: LocalId, source: usize, work: &DistAccumulator) {
    let data = graph.data(lid);
    if !data.reached() || data.num_successors.load(Ordering::Relaxed) == 0 {
        return;
    }
    if graph.global_id(lid) == source {
        data.num_successors.store(0, Ordering::Relaxed);
        return;
    }

    let paths = data.num_shortest_paths.load(Ordering::Relaxed) as f32;
    let next = data.distance() + 1;
    let mut consumed = 0;
    let mut delta = 0.0f32;
    for &dst in graph.edges(lid) {
        let head = graph.data(dst);
        if head.distance() != next || !head.dependency_ready.load(Ordering::Relaxed) {
            continue;
        }
        // Zero only when path counting was cut short by the round limit.
        let head_paths = head.num_shortest_paths.load(Ordering::Relaxed);
        if head_paths > 0 {
            delta += paths / head_paths as f32 * (1.0 + head.dependency.load(Ordering::Relaxed));
        }
        consumed += 1;
    }

    if consumed > 0 {
        let bitsets = graph.bitsets();
        data.trim.fetch_add(consumed, Ordering::Relaxed);
        data.to_add_float.fetch_add(delta, Ordering::Relaxed);
        bitsets.trim.set(lid);
        bitsets.to_add_float.set(lid);
        work.add(u64::from(consumed));
    }
}

fn apply_changes<G: PartitionedGraph>(graph: &G, lid: LocalId) -> Result<()> {
    let data = graph.data(lid);
    if !data.reached() {
        return Ok(());
    }
    let bitsets = graph.bitsets();

    let to_add = data.to_add_float.swap(0.0, Ordering::Relaxed);
    if to_add != 0.0 {
        data.dependency.fetch_add(to_add, Ordering::Relaxed);
        bitsets.dependency.set(lid);
    }

    let successors = data.num_successors.load(Ordering::Relaxed);
    if successors == 0 && data.dependency_ready.load(Ordering::Relaxed) {
        // Every predecessor consumed this node in the round that just ended.
        data.dependency_ready.store(false, Ordering::Relaxed);
        data.num_shortest_paths.store(0, Ordering::Relaxed);
        bitsets.dependency_ready.set(lid);
        return Ok(());
    }

    let trim = data.trim.swap(0, Ordering::Relaxed);
    if trim > 0 {
        if trim > successors {
            return Err(Error::InvariantViolation {
                node: graph.global_id(lid),
                field: "num_successors",
                trim,
                count: successors,
            });
        }
        data.num_successors.store(successors - trim, Ordering::Relaxed);
        if successors == trim {
            data.dependency_ready.store(true, Ordering::Relaxed);
            bitsets.dependency_ready.set(lid);
        }
    }
    Ok(())
}

fn sync_finished<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) -> Result<()> {
    ctx.graph
        .sync::<Dependency>(Role::Source, Role::Destination, Reduce::Overwrite, ctx.filter())
}

pub fn run<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) -> Result<PhaseStats> {
    let graph = ctx.graph;
    let filter = ctx.filter();
    let work = DistAccumulator::new();

    ctx.exec.for_each(0..graph.num_local(), |lid| {
        let data = graph.data(lid);
        if data.reached()
            && data.num_successors.load(Ordering::Relaxed) == 0
            && graph.global_id(lid) != ctx.source
        {
            data.dependency_ready.store(true, Ordering::Relaxed);
        }
    });

    let stats = converge(ctx, "dependency", || {
        work.reset();
        ctx.exec
            .for_each(0..graph.num_local(), |lid| pull(graph, lid, ctx.source, &work));
        graph.sync::<Trim>(Role::Source, Role::Source, Reduce::Add, filter)?;
        graph.sync::<ToAddFloat>(Role::Source, Role::Source, Reduce::Add, filter)?;
        ctx.exec.try_for_each(0..graph.num_local(), |lid| apply_changes(graph, lid))?;
        graph.sync::<DependencyReady>(Role::Source, Role::Destination, Reduce::Overwrite, filter)?;
        sync_finished(ctx)?;
        work.reduce(graph.transport(), "dependency/work")
    })?;
    sync_finished(ctx)?;

    debug!(host = graph.host_id(), source = ctx.source, rounds = stats.rounds, "dependencies propagated");
    Ok(stats)
}
