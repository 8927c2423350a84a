use crate::bitset::Bitsets;
use crate::error::Result;
use crate::graph::{Filter, PartitionedGraph, Reduce, Role, RoleMask, DESTINATION, SOURCE};
use crate::net::Transport;
use crate::node::NodeData;
use crate::sync::SyncField;
use crate::types::*;
use bit_vec::BitVec;
use std::collections::HashMap;
use std::ops::Range;

/// The slice of a graph one host holds.
///
/// Local ids `0..owned.len()` map onto the owned global range in order;
/// mirrors follow, sorted by global id. Edges are kept as CSR over local ids.
#[derive(Debug, Clone)]
pub struct HostPartition {
    pub(crate) host_id: HostId,
    pub(crate) total_nodes: usize,
    pub(crate) owned: Range<NodeId>,
    pub(crate) mirrors: Vec<NodeId>,
    pub(crate) mirror_lids: HashMap<NodeId, LocalId>,
    pub(crate) mirror_owners: Vec<HostId>,
    pub(crate) offsets: Vec<usize>,
    pub(crate) targets: Vec<LocalId>,
    pub(crate) has_out_edges: BitVec,
    pub(crate) has_in_edges: BitVec,
    /// For each owned node, the hosts holding a mirror and that mirror's roles.
    pub(crate) directory: Vec<Vec<(HostId, RoleMask)>>,
    pub(crate) vertex_cut: bool,
}

impl HostPartition {
    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    pub fn owned(&self) -> Range<NodeId> {
        self.owned.clone()
    }

    pub fn num_owned(&self) -> usize {
        self.owned.len()
    }

    pub fn num_mirrors(&self) -> usize {
        self.mirrors.len()
    }

    pub fn num_local(&self) -> usize {
        self.num_owned() + self.num_mirrors()
    }

    pub fn num_edges(&self) -> usize {
        self.targets.len()
    }

    pub fn global_id(&self, lid: LocalId) -> NodeId {
        match lid.checked_sub(self.num_owned()) {
            None => self.owned.start + lid,
            Some(m) => self.mirrors[m],
        }
    }

    pub fn local_id(&self, gid: NodeId) -> Option<LocalId> {
        if self.owned.contains(&gid) {
            Some(gid - self.owned.start)
        } else {
            self.mirror_local_id(gid)
        }
    }

    pub(crate) fn mirror_local_id(&self, gid: NodeId) -> Option<LocalId> {
        self.mirror_lids.get(&gid).copied()
    }

    pub(crate) fn owned_local_id(&self, gid: NodeId) -> LocalId {
        debug_assert!(self.owned.contains(&gid), "{} not owned by host {}", gid, self.host_id);
        gid - self.owned.start
    }

    pub(crate) fn mirror_owner(&self, lid: LocalId) -> HostId {
        self.mirror_owners[lid - self.num_owned()]
    }

    pub(crate) fn mirror_directory(&self, lid: LocalId) -> &[(HostId, RoleMask)] {
        &self.directory[lid]
    }

    pub fn role_mask(&self, lid: LocalId) -> RoleMask {
        let mut mask = 0;
        if self.has_out_edges.get(lid).unwrap_or(false) {
            mask |= SOURCE;
        }
        if self.has_in_edges.get(lid).unwrap_or(false) {
            mask |= DESTINATION;
        }
        mask
    }

    pub fn out_neigh(&self, lid: LocalId) -> &[LocalId] {
        &self.targets[self.offsets[lid]..self.offsets[lid + 1]]
    }
}

/// A host partition bound to its transport and per-node storage.
pub struct DistGraph<T: Transport> {
    pub(crate) partition: HostPartition,
    pub(crate) transport: T,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) bitsets: Bitsets,
}

impl<T: Transport> DistGraph<T> {
    pub fn new(partition: HostPartition, transport: T) -> Self {
        debug_assert_eq!(partition.host_id, transport.host_id());
        let num_local = partition.num_local();
        Self {
            partition,
            transport,
            nodes: (0..num_local).map(|_| NodeData::default()).collect(),
            bitsets: Bitsets::new(num_local),
        }
    }

    pub fn partition(&self) -> &HostPartition {
        &self.partition
    }
}

impl<T: Transport> PartitionedGraph for DistGraph<T> {
    type Transport = T;

    fn transport(&self) -> &T {
        &self.transport
    }

    fn total_nodes(&self) -> usize {
        self.partition.total_nodes
    }

    fn num_owned(&self) -> usize {
        self.partition.num_owned()
    }

    fn num_local(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn global_id(&self, lid: LocalId) -> NodeId {
        self.partition.global_id(lid)
    }

    fn local_id(&self, gid: NodeId) -> Option<LocalId> {
        self.partition.local_id(gid)
    }

    fn is_owned(&self, gid: NodeId) -> bool {
        self.partition.owned.contains(&gid)
    }

    #[inline]
    fn edges(&self, lid: LocalId) -> &[LocalId] {
        self.partition.out_neigh(lid)
    }

    fn is_vertex_cut(&self) -> bool {
        self.partition.vertex_cut
    }

    #[inline]
    fn data(&self, lid: LocalId) -> &NodeData {
        &self.nodes[lid]
    }

    fn bitsets(&self) -> &Bitsets {
        &self.bitsets
    }

    fn sync<F: SyncField>(&self, write: Role, read: Role, reduce: Reduce, filter: Filter) -> Result<()> {
        self.sync_field::<F>(write, read, reduce, filter)
    }
}
