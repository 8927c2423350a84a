//! Betweenness centrality over a partitioned graph.
//!
//! For every source in the configured range this runs Brandes' \[1\] four
//! steps as bulk-synchronous phases: BFS distances, shortest-path DAG
//! counting, path counts pushed down the DAG, and dependencies pulled back up.
//! Each owned node then adds its dependency into its centrality. Scores are
//! unnormalized and, as in \[1\], a node is never credited for paths it starts.
//!
//! ## Sources
//! \[1\] Ulrik Brandes. "A faster algorithm for betweenness centrality." Journal of
//!     Mathematical Sociology, 25(2):163–177, 2001.
//! \[2\] Kamesh Madduri, David Ediger, Karl Jiang, David A Bader, and Daniel
//!     Chavarria-Miranda. "A faster parallel algorithm and efficient multithreaded
//!     implementations for evaluating betweenness centrality on massive datasets."
//!     International Symposium on Parallel & Distributed Processing (IPDPS), 2009.

use crate::config::BcConfig;
use crate::error::Result;
use crate::exec::Executor;
use crate::graph::{Filter, PartitionedGraph};
use crate::slidingqueue::SlidingQueue;
use crate::timer::ScopedTimer;
use crate::types::*;
use crate::{bfs, dag, dependency, paths};
use std::ops::Range;
use std::sync::atomic::Ordering;
use tracing::{debug, info, instrument, warn};

/// Host 0 reports progress whenever a source id is a multiple of this.
pub const PROGRESS_INTERVAL: NodeId = 5000;

type Score = f64;
type Count = f64;

/// Everything a phase needs while processing one source.
pub struct SourceContext<'a, G, E> {
    pub graph: &'a G,
    pub exec: &'a E,
    pub config: &'a BcConfig,
    pub source: NodeId,
}

impl<'a, G: PartitionedGraph, E: Executor> SourceContext<'a, G, E> {
    pub fn filter(&self) -> Filter {
        if self.config.dirty_bitsets {
            Filter::Dirty
        } else {
            Filter::Unfiltered
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseStats {
    pub rounds: u32,
    /// Sum over rounds of the globally reduced work counter.
    pub work: u64,
    /// False when the round limit cut the phase short.
    pub converged: bool,
}

/// Runs `round` until it reports no global work or `max_rounds` is reached.
///
/// `round` must return the same globally reduced count on every host, so all
/// hosts leave the loop together.
pub(crate) fn converge<G, E>(
    ctx: &SourceContext<'_, G, E>,
    phase: &'static str,
    mut round: impl FnMut() -> Result<u64>,
) -> Result<PhaseStats>
where
    G: PartitionedGraph,
    E: Executor,
{
    let mut stats = PhaseStats::default();
    loop {
        let work = round()?;
        stats.rounds += 1;
        stats.work += work;
        if work == 0 {
            stats.converged = true;
            return Ok(stats);
        }
        if stats.rounds >= ctx.config.max_rounds {
            warn!(
                host = ctx.graph.host_id(),
                source = ctx.source,
                phase,
                rounds = stats.rounds,
                "round limit reached before convergence"
            );
            return Ok(stats);
        }
    }
}

/// One host's share of a BC run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BcReport {
    pub host: HostId,
    /// Centrality of every owned node, by global id.
    pub scores: Vec<(NodeId, f32)>,
    pub sources: usize,
    pub bfs_rounds: u64,
    pub path_rounds: u64,
    pub dependency_rounds: u64,
    /// Some phase stopped at the round limit; scores may be incomplete.
    pub round_limit_hit: bool,
}

impl BcReport {
    fn record(&mut self, bfs: PhaseStats, paths: PhaseStats, dependency: PhaseStats) {
        self.sources += 1;
        self.bfs_rounds += u64::from(bfs.rounds);
        self.path_rounds += u64::from(paths.rounds);
        self.dependency_rounds += u64::from(dependency.rounds);
        self.round_limit_hit |= !(bfs.converged && paths.converged && dependency.converged);
    }
}

/// Zeroes every label on every local node, centrality included.
pub fn reset<G: PartitionedGraph, E: Executor>(graph: &G, exec: &E) {
    exec.for_each(0..graph.num_local(), |lid| graph.data(lid).reset());
    graph.bitsets().clear();
}

pub(crate) fn initialize_iteration<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) {
    let graph = ctx.graph;
    ctx.exec.for_each(0..graph.num_local(), |lid| {
        graph.data(lid).reset_for_source(graph.global_id(lid) == ctx.source)
    });
}

fn accumulate<G: PartitionedGraph, E: Executor>(ctx: &SourceContext<'_, G, E>) {
    let graph = ctx.graph;
    ctx.exec.for_each(0..graph.num_owned(), |lid| {
        let data = graph.data(lid);
        let dependency = data.dependency.swap(0.0, Ordering::Relaxed);
        if dependency != 0.0 {
            data.betweenness_centrality.fetch_add(dependency, Ordering::Relaxed);
        }
    });
}

fn process_source<G: PartitionedGraph, E: Executor>(
    ctx: &SourceContext<'_, G, E>,
) -> Result<(PhaseStats, PhaseStats, PhaseStats)> {
    initialize_iteration(ctx);
    let bfs = bfs::run(ctx)?;
    dag::run(ctx)?;
    let paths = paths::run(ctx)?;
    let dependency = dependency::run(ctx)?;
    accumulate(ctx);
    Ok((bfs, paths, dependency))
}

/// Centrality of every owned node, by global id.
pub fn scores<G: PartitionedGraph>(graph: &G) -> Vec<(NodeId, f32)> {
    (0..graph.num_owned())
        .map(|lid| {
            let score = graph.data(lid).betweenness_centrality.load(Ordering::Relaxed);
            (graph.global_id(lid), score)
        })
        .collect()
}

/// Adds the contribution of every configured source to the owned nodes'
/// centrality. Collective: every host must call it with the same config.
/// Scores accumulate across calls until `reset`.
#[instrument(skip_all, fields(host = graph.host_id(), exec = exec.name()))]
pub fn compute_bc<G: PartitionedGraph, E: Executor>(graph: &G, exec: &E, config: &BcConfig) -> Result<BcReport> {
    config.validate()?;
    let sources = config.sources.resolve(graph.total_nodes())?;
    let mut timer = ScopedTimer::new("compute_bc");
    info!(?sources, owned = graph.num_owned(), local = graph.num_local(), "starting");
    timer.checkpoint("sources");

    let mut report = BcReport {
        host: graph.host_id(),
        ..BcReport::default()
    };
    for source in sources {
        if graph.host_id() == 0 && source % PROGRESS_INTERVAL == 0 {
            info!(source, "processing source");
        }
        let ctx = SourceContext {
            graph,
            exec,
            config,
            source,
        };
        let (bfs, paths, dependency) = process_source(&ctx)?;
        debug!(source, bfs = bfs.rounds, paths = paths.rounds, dependency = dependency.rounds, "source done");
        report.record(bfs, paths, dependency);
    }
    let source_time = timer.elapsed_since_checkpoint().unwrap_or_default();
    report.scores = scores(graph);

    info!(
        sources = report.sources,
        round_limit_hit = report.round_limit_hit,
        source_ms = source_time.as_millis() as u64,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "finished"
    );
    Ok(report)
}

fn pbfs(
    adjacency: &[Vec<NodeId>],
    source: NodeId,
    depths: &mut [Option<usize>],
    path_counts: &mut [Count],
    depth_index: &mut Vec<Vec<NodeId>>,
    queue: &mut SlidingQueue<NodeId>,
) {
    depths[source] = Some(0);
    path_counts[source] = 1.0;
    queue.push_back(source);
    queue.slide_window();

    let mut depth = 0;
    while !queue.empty() {
        depth += 1;
        let frontier = queue.window().to_vec();
        for &u in &frontier {
            for &v in &adjacency[u] {
                if depths[v].is_none() {
                    depths[v] = Some(depth);
                    queue.push_back(v);
                }
                if depths[v] == Some(depth) {
                    path_counts[v] += path_counts[u];
                }
            }
        }
        depth_index.push(frontier);
        queue.slide_window();
    }
}

/// Sequential Brandes over the same sources, for checking distributed runs.
pub fn brandes(num_nodes: usize, edge_list: &EdgeList, sources: Range<NodeId>) -> Vec<Score> {
    let mut adjacency = vec![Vec::new(); num_nodes];
    for &(u, v) in edge_list.iter().filter(|(u, v)| u != v) {
        adjacency[u].push(v);
    }
    for neighbours in &mut adjacency {
        neighbours.sort_unstable();
        neighbours.dedup();
    }

    let mut scores = vec![0.0; num_nodes];
    let mut path_counts = vec![0.0; num_nodes];
    let mut deltas = vec![0.0; num_nodes];
    let mut depths = vec![None; num_nodes];
    let mut depth_index: Vec<Vec<NodeId>> = Vec::new();
    let mut queue = SlidingQueue::with_capacity(num_nodes);

    for source in sources {
        path_counts.iter_mut().for_each(|c| *c = 0.0);
        deltas.iter_mut().for_each(|d| *d = 0.0);
        depths.iter_mut().for_each(|d| *d = None);
        depth_index.clear();
        queue.reset();

        pbfs(&adjacency, source, &mut depths, &mut path_counts, &mut depth_index, &mut queue);

        for level in depth_index.iter().rev() {
            for &u in level {
                let next = depths[u].map(|d| d + 1);
                let delta_u: Score = adjacency[u]
                    .iter()
                    .filter(|&&v| depths[v] == next)
                    .map(|&v| path_counts[u] / path_counts[v] * (1.0 + deltas[v]))
                    .sum();
                deltas[u] = delta_u;
                if u != source {
                    scores[u] += delta_u;
                }
            }
        }
    }

    scores
}

/// Scales scores into `[0, 1]` by the largest one.
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let biggest = scores.iter().copied().fold(0.0f32, f32::max);
    if biggest == 0.0 {
        return scores.to_vec();
    }
    scores.iter().map(|s| s / biggest).collect()
}

/// Compares distributed scores against sequential Brandes.
pub fn verifier(num_nodes: usize, edge_list: &EdgeList, sources: Range<NodeId>, scores: &[f32]) -> bool {
    const TOLERANCE: f64 = 1e-4;
    let reference = brandes(num_nodes, edge_list, sources);
    reference.len() == scores.len()
        && reference
            .iter()
            .zip(scores)
            .all(|(&want, &got)| (want - f64::from(got)).abs() <= TOLERANCE * want.abs().max(1.0))
}
