//! Successor and predecessor counts on the shortest-path DAG.
//!
//! An edge `u -> v` is on the DAG when `dist(v) == dist(u) + 1`. Each replica
//! counts the DAG edges it holds; the add-syncs then total the counts on the
//! owner and hand them to the replicas that consume them.

use crate::bc::SourceContext;
use crate::error::Result;
use crate::exec::Executor;
use crate::graph::{PartitionedGraph, Reduce, Role};
use crate::sync::{NumPredecessors, NumSuccessors};
use std::sync::atomic::Ordering;
use tracing::debug;

pub fn run<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) -> Result<()> {
    let graph = ctx.graph;
    let bitsets = graph.bitsets();

    ctx.exec.for_each(0..graph.num_local(), |lid| {
        let data = graph.data(lid);
        if !data.reached() {
            return;
        }
        let next = data.distance() + 1;
        let mut successors = 0;
        for &dst in graph.edges(lid) {
            let head = graph.data(dst);
            if head.distance() == next {
                successors += 1;
                head.num_predecessors.fetch_add(1, Ordering::Relaxed);
                bitsets.num_predecessors.set(dst);
            }
        }
        if successors > 0 {
            data.num_successors.fetch_add(successors, Ordering::Relaxed);
            bitsets.num_successors.set(lid);
        }
    });

    // Predecessors are counted at edge heads and consumed where paths are pushed from.
    graph.sync::<NumPredecessors>(Role::Destination, Role::Source, Reduce::Add, ctx.filter())?;
    graph.sync::<NumSuccessors>(Role::Source, Role::Any, Reduce::Add, ctx.filter())?;

    debug!(host = graph.host_id(), source = ctx.source, "dag counted");
    Ok(())
}
