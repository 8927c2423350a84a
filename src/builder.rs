use crate::config::PartitionPolicy;
use crate::graph::RoleMask;
use crate::partition::HostPartition;
use crate::types::*;
use bit_vec::BitVec;
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Splits a global edge list into one `HostPartition` per host.
///
/// Nodes are owned in contiguous blocks. Under an edge-cut every edge lives
/// with the owner of its tail; under a vertex-cut edges are hashed, so a node
/// may have source and destination replicas on different hosts.
pub struct PartitionBuilder {
    num_hosts: usize,
    policy: PartitionPolicy,
    symmetrize: bool,
    num_nodes: Option<usize>,
}

impl PartitionBuilder {
    pub fn new(num_hosts: usize, policy: PartitionPolicy) -> Self {
        Self {
            num_hosts: num_hosts.max(1),
            policy,
            symmetrize: false,
            num_nodes: None,
        }
    }

    /// Adds the reverse of every edge before building.
    pub fn symmetrize(mut self, symmetrize: bool) -> Self {
        self.symmetrize = symmetrize;
        self
    }

    /// Fixes the node count; otherwise it is one past the largest id seen.
    pub fn with_num_nodes(mut self, num_nodes: usize) -> Self {
        self.num_nodes = Some(num_nodes);
        self
    }

    pub fn find_max_node_id(edge_list: &EdgeList) -> Option<NodeId> {
        edge_list.iter().flat_map(|&(u, v)| [u, v]).max()
    }

    pub fn num_nodes(&self, edge_list: &EdgeList) -> usize {
        let seen = Self::find_max_node_id(edge_list).map_or(0, |max| max + 1);
        self.num_nodes.map_or(seen, |n| n.max(seen))
    }

    /// Sorted edge list without duplicates or self-loops.
    pub fn squish(&self, edge_list: &EdgeList) -> EdgeList {
        let mut edges: EdgeList = if self.symmetrize {
            edge_list.iter().flat_map(|&(u, v)| [(u, v), (v, u)]).collect()
        } else {
            edge_list.clone()
        };
        edges.par_sort_unstable();
        edges.into_iter().dedup().filter(|&(u, v)| u != v).collect()
    }

    /// First owned id of every host, followed by `num_nodes`.
    pub fn block_starts(&self, num_nodes: usize) -> Vec<NodeId> {
        (0..=self.num_hosts).map(|h| h * num_nodes / self.num_hosts).collect()
    }

    pub fn owner(block_starts: &[NodeId], node: NodeId) -> HostId {
        block_starts.partition_point(|&start| start <= node) - 1
    }

    fn edge_host(&self, block_starts: &[NodeId], (u, v): Edge) -> HostId {
        match self.policy {
            PartitionPolicy::EdgeCut => Self::owner(block_starts, u),
            PartitionPolicy::VertexCut => {
                let h = (u as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    ^ (v as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
                ((h >> 32) % self.num_hosts as u64) as HostId
            }
        }
    }

    fn count_degrees(local_edges: &[(LocalId, LocalId)], num_local: usize) -> Vec<usize> {
        let degrees: Vec<AtomicUsize> = (0..num_local).map(|_| AtomicUsize::new(0)).collect();
        local_edges.par_iter().for_each(|&(u, _)| {
            degrees[u].fetch_add(1, Ordering::Relaxed);
        });
        degrees.into_iter().map(AtomicUsize::into_inner).collect()
    }

    pub fn build(&self, edge_list: &EdgeList) -> Vec<HostPartition> {
        let num_nodes = self.num_nodes(edge_list);
        let edges = self.squish(edge_list);
        let starts = self.block_starts(num_nodes);

        let mut per_host: Vec<EdgeList> = vec![Vec::new(); self.num_hosts];
        for &edge in &edges {
            per_host[self.edge_host(&starts, edge)].push(edge);
        }

        let mut partitions: Vec<HostPartition> = per_host
            .into_par_iter()
            .enumerate()
            .map(|(host, host_edges)| self.build_host(host, &host_edges, &starts, num_nodes))
            .collect();

        let mut directories: Vec<Vec<Vec<(HostId, RoleMask)>>> = partitions
            .iter()
            .map(|p| vec![Vec::new(); p.num_owned()])
            .collect();
        for p in &partitions {
            for (m, &gid) in p.mirrors.iter().enumerate() {
                let owner = p.mirror_owners[m];
                let mask = p.role_mask(p.num_owned() + m);
                directories[owner][gid - starts[owner]].push((p.host_id, mask));
            }
        }
        for (p, directory) in partitions.iter_mut().zip(directories) {
            p.directory = directory;
        }

        debug!(
            hosts = self.num_hosts,
            nodes = num_nodes,
            edges = edges.len(),
            policy = ?self.policy,
            "partitioned graph"
        );
        partitions
    }

    fn build_host(&self, host: HostId, edges: &[Edge], starts: &[NodeId], total_nodes: usize) -> HostPartition {
        let owned: Range<NodeId> = starts[host]..starts[host + 1];
        let mirrors: Vec<NodeId> = edges
            .iter()
            .flat_map(|&(u, v)| [u, v])
            .filter(|gid| !owned.contains(gid))
            .sorted_unstable()
            .dedup()
            .collect();
        let mirror_lids: HashMap<NodeId, LocalId> = mirrors
            .iter()
            .enumerate()
            .map(|(m, &gid)| (gid, owned.len() + m))
            .collect();
        let to_local = |gid: NodeId| {
            if owned.contains(&gid) {
                gid - owned.start
            } else {
                mirror_lids[&gid]
            }
        };

        let num_local = owned.len() + mirrors.len();
        let local_edges: Vec<(LocalId, LocalId)> =
            edges.iter().map(|&(u, v)| (to_local(u), to_local(v))).collect();

        let degrees = Self::count_degrees(&local_edges, num_local);
        let mut offsets = Vec::with_capacity(num_local + 1);
        offsets.push(0);
        for d in &degrees {
            offsets.push(offsets[offsets.len() - 1] + d);
        }

        let mut cursor = offsets.clone();
        let mut targets = vec![0; local_edges.len()];
        let mut has_out_edges = BitVec::from_elem(num_local, false);
        let mut has_in_edges = BitVec::from_elem(num_local, false);
        for &(u, v) in &local_edges {
            targets[cursor[u]] = v;
            cursor[u] += 1;
            has_out_edges.set(u, true);
            has_in_edges.set(v, true);
        }

        let mirror_owners = mirrors.iter().map(|&gid| Self::owner(starts, gid)).collect();

        HostPartition {
            host_id: host,
            total_nodes,
            owned,
            mirrors,
            mirror_lids,
            mirror_owners,
            offsets,
            targets,
            has_out_edges,
            has_in_edges,
            directory: Vec::new(),
            vertex_cut: self.policy == PartitionPolicy::VertexCut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DESTINATION, SOURCE};

    fn sample() -> EdgeList {
        vec![(0, 1), (0, 1), (1, 1), (1, 2), (2, 3), (3, 0), (4, 2), (5, 4), (2, 5)]
    }

    #[test]
    fn squish_sorts_and_drops_duplicates_and_self_loops() {
        let builder = PartitionBuilder::new(1, PartitionPolicy::EdgeCut);
        let edges = builder.squish(&vec![(2, 1), (0, 1), (2, 1), (3, 3)]);
        assert_eq!(edges, vec![(0, 1), (2, 1)]);

        let builder = builder.symmetrize(true);
        let edges = builder.squish(&vec![(0, 1), (1, 0), (1, 2)]);
        assert_eq!(edges, vec![(0, 1), (1, 0), (1, 2), (2, 1)]);
    }

    #[test]
    fn blocks_cover_every_node_once() {
        let builder = PartitionBuilder::new(3, PartitionPolicy::EdgeCut);
        let starts = builder.block_starts(10);
        assert_eq!(starts, vec![0, 3, 6, 10]);
        let owners: Vec<_> = (0..10).map(|n| PartitionBuilder::owner(&starts, n)).collect();
        assert_eq!(owners, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 2]);

        // More hosts than nodes leaves some blocks empty.
        let starts = PartitionBuilder::new(4, PartitionPolicy::EdgeCut).block_starts(2);
        assert_eq!(PartitionBuilder::owner(&starts, 0), 1);
        assert_eq!(PartitionBuilder::owner(&starts, 1), 3);
    }

    #[test]
    fn edge_cut_keeps_edges_with_their_tail() {
        let parts = PartitionBuilder::new(2, PartitionPolicy::EdgeCut).build(&sample());
        assert_eq!(parts.iter().map(HostPartition::num_edges).sum::<usize>(), 7);

        for p in &parts {
            assert!(!p.vertex_cut);
            for lid in 0..p.num_local() {
                if !p.out_neigh(lid).is_empty() {
                    assert!(p.owned().contains(&p.global_id(lid)));
                }
            }
            // Mirrors only ever appear as edge heads.
            for lid in p.num_owned()..p.num_local() {
                assert_eq!(p.role_mask(lid), DESTINATION);
            }
        }
    }

    #[test]
    fn vertex_cut_preserves_every_edge() {
        let parts = PartitionBuilder::new(3, PartitionPolicy::VertexCut).build(&sample());
        let mut seen: EdgeList = parts
            .iter()
            .flat_map(|p| {
                (0..p.num_local()).flat_map(move |lid| {
                    p.out_neigh(lid).iter().map(move |&dst| (p.global_id(lid), p.global_id(dst)))
                })
            })
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3), (2, 5), (3, 0), (4, 2), (5, 4)]);
        assert!(parts.iter().all(|p| p.vertex_cut));
    }

    #[test]
    fn directory_lists_every_mirror() {
        let parts = PartitionBuilder::new(3, PartitionPolicy::VertexCut).build(&sample());
        let starts = PartitionBuilder::new(3, PartitionPolicy::VertexCut).block_starts(6);

        let listed: usize = parts.iter().flat_map(|p| p.directory.iter()).map(Vec::len).sum();
        let mirrors: usize = parts.iter().map(HostPartition::num_mirrors).sum();
        assert_eq!(listed, mirrors);

        for p in &parts {
            for lid in p.num_owned()..p.num_local() {
                let gid = p.global_id(lid);
                let owner = &parts[PartitionBuilder::owner(&starts, gid)];
                let entry = owner.mirror_directory(owner.local_id(gid).unwrap());
                assert!(entry.contains(&(p.host_id(), p.role_mask(lid))));
                assert_ne!(p.role_mask(lid) & (SOURCE | DESTINATION), 0);
            }
        }
    }

    #[test]
    fn isolated_nodes_are_still_owned() {
        let parts = PartitionBuilder::new(2, PartitionPolicy::EdgeCut)
            .with_num_nodes(8)
            .build(&vec![(0, 1)]);
        assert_eq!(parts.iter().map(HostPartition::num_owned).sum::<usize>(), 8);
        assert_eq!(parts[1].num_edges(), 0);
    }
}
