//! Level-synchronous BFS from the current source.
//!
//! Round 0 relaxes only the source's edges. Every later round relaxes the
//! edges of each replica whose distance dropped since it last pushed, then
//! min-syncs distances from destination replicas to everyone. The phase ends
//! when a round improves no distance on any host.

use crate::bc::{converge, PhaseStats, SourceContext};
use crate::error::Result;
use crate::exec::Executor;
use crate::graph::{PartitionedGraph, Reduce, Role};
use crate::net::DistAccumulator;
use crate::sync::CurrentLength;
use crate::types::LocalId;
use std::sync::atomic::Ordering;
use tracing::debug;

fn relax<G: PartitionedGraph>(graph: &G, lid: LocalId, work: &DistAccumulator) {
    let next = graph.data(lid).distance() + 1;
    for &dst in graph.edges(lid) {
        if graph.data(dst).current_length.fetch_min(next, Ordering::Relaxed) > next {
            graph.bitsets().current_length.set(dst);
            work.add(1);
        }
    }
}

fn sync_distances<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) -> Result<()> {
    ctx.graph
        .sync::<CurrentLength>(Role::Destination, Role::Any, Reduce::Min, ctx.filter())
}

pub fn run<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) -> Result<PhaseStats> {
    let graph = ctx.graph;
    let work = DistAccumulator::new();

    if let Some(lid) = graph.local_id(ctx.source) {
        relax(graph, lid, &work);
    }
    sync_distances(ctx)?;

    let stats = converge(ctx, "bfs", || {
        work.reset();
        ctx.exec.for_each(0..graph.num_local(), |lid| {
            let data = graph.data(lid);
            let current = data.distance();
            if data.old_length.load(Ordering::Relaxed) > current {
                data.old_length.store(current, Ordering::Relaxed);
                relax(graph, lid, &work);
            }
        });
        sync_distances(ctx)?;
        work.reduce(graph.transport(), "bfs/work")
    })?;

    debug!(host = graph.host_id(), source = ctx.source, rounds = stats.rounds, "bfs done");
    Ok(stats)
}
