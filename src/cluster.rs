//! Runs a partitioned graph on in-process hosts, one thread per host.

use crate::bc::{self, BcReport};
use crate::builder::PartitionBuilder;
use crate::config::{BcConfig, ClusterConfig};
use crate::error::{Error, Result};
use crate::exec::Backend;
use crate::net::ChannelTransport;
use crate::partition::{DistGraph, HostPartition};
use crate::types::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Cluster {
    config: ClusterConfig,
    total_nodes: usize,
    partitions: Vec<HostPartition>,
}

impl Cluster {
    pub fn new(config: ClusterConfig, edge_list: &EdgeList) -> Result<Self> {
        let builder = PartitionBuilder::new(config.hosts, config.partition);
        Self::with_builder(config, &builder, edge_list)
    }

    pub fn with_builder(config: ClusterConfig, builder: &PartitionBuilder, edge_list: &EdgeList) -> Result<Self> {
        config.validate()?;
        let total_nodes = builder.num_nodes(edge_list);
        let partitions = builder.build(edge_list);
        if partitions.len() != config.hosts {
            return Err(Error::Config(format!(
                "builder produced {} partitions for {} hosts",
                partitions.len(),
                config.hosts
            )));
        }
        info!(
            hosts = config.hosts,
            nodes = total_nodes,
            policy = ?config.partition,
            "cluster ready"
        );
        Ok(Self {
            config,
            total_nodes,
            partitions,
        })
    }

    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn partitions(&self) -> &[HostPartition] {
        &self.partitions
    }

    /// Runs `job` on every host at once and returns the per-host results in
    /// host order. If any host fails, its transport is dropped, which unblocks
    /// peers waiting on it with `Disconnected`; the first root-cause error wins.
    pub fn run<R, F>(&self, job: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&DistGraph<ChannelTransport>, &Backend) -> Result<R> + Sync,
    {
        let timeout = self.config.sync_timeout_ms.map(Duration::from_millis);
        let transports = ChannelTransport::mesh(self.config.hosts, timeout);
        let threads = self.config.threads_per_host;
        let job = &job;

        let joined = crossbeam_utils::thread::scope(|s| {
            let handles: Vec<_> = self
                .partitions
                .iter()
                .cloned()
                .zip(transports)
                .map(|(partition, transport)| {
                    s.spawn(move |_| {
                        let host = partition.host_id();
                        let graph = DistGraph::new(partition, transport);
                        let exec = Backend::new(threads, host)?;
                        job(&graph, &exec)
                    })
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(host, handle)| handle.join().unwrap_or(Err(Error::HostPanicked(host))))
                .collect::<Vec<_>>()
        })
        .map_err(|_| Error::HostPanicked(0))?;

        let mut results = Vec::with_capacity(joined.len());
        let mut failure: Option<Error> = None;
        for (host, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Ok(r) => results.push(r),
                Err(e) => {
                    error!(host, error = %e, "host failed");
                    let replace = match &failure {
                        None => true,
                        Some(Error::Disconnected { .. }) => !matches!(e, Error::Disconnected { .. }),
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(e);
                    }
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// Per-host reports of a fresh BC run.
    pub fn reports(&self, config: &BcConfig) -> Result<Vec<BcReport>> {
        self.run(|graph, exec| {
            bc::reset(graph, exec);
            bc::compute_bc(graph, exec, config)
        })
    }

    /// Centrality of every node, indexed by global id.
    pub fn betweenness(&self, config: &BcConfig) -> Result<Vec<f32>> {
        let mut scores = vec![0.0; self.total_nodes];
        for report in self.reports(config)? {
            for (node, score) in report.scores {
                scores[node] = score;
            }
        }
        Ok(scores)
    }
}

/// Helpers for exercising single phases on every host.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::bc::SourceContext;
    use crate::config::PartitionPolicy;
    use crate::graph::PartitionedGraph;
    use crate::node::NodeData;

    pub(crate) type Ctx<'a> = SourceContext<'a, DistGraph<ChannelTransport>, Backend>;

    /// Prepares `source` on every host and runs `job` there, returning
    /// whatever each host reports, flattened.
    pub(crate) fn run_source<T, F>(edges: &EdgeList, hosts: usize, policy: PartitionPolicy, source: NodeId, job: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Ctx<'_>) -> Result<Vec<T>> + Sync,
    {
        let config = BcConfig::default();
        Cluster::new(ClusterConfig::new(hosts, policy).with_threads(2), edges)
            .unwrap()
            .run(|graph, exec| {
                bc::reset(graph, exec);
                let ctx = SourceContext {
                    graph,
                    exec,
                    config: &config,
                    source,
                };
                bc::initialize_iteration(&ctx);
                job(&ctx)
            })
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    /// `(global id, field)` for every owned node.
    pub(crate) fn owned<T>(ctx: &Ctx<'_>, field: impl Fn(&NodeData) -> T) -> Vec<(NodeId, T)> {
        (0..ctx.graph.num_owned())
            .map(|lid| (ctx.graph.global_id(lid), field(ctx.graph.data(lid))))
            .collect()
    }

    pub(crate) fn sorted<T>(mut pairs: Vec<(NodeId, T)>) -> Vec<T> {
        pairs.sort_by_key(|&(node, _)| node);
        pairs.into_iter().map(|(_, v)| v).collect()
    }

    /// 0 -> {1, 2} -> 3 -> 4, plus 5 -> 0 which no BFS from 0 reaches.
    pub(crate) fn diamond() -> EdgeList {
        vec![(0, 1), (0, 2), (1, 3), (2, 3), (3, 4), (5, 0)]
    }

    pub(crate) const POLICIES: [PartitionPolicy; 2] = [PartitionPolicy::EdgeCut, PartitionPolicy::VertexCut];
}
