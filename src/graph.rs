use crate::bitset::Bitsets;
use crate::error::Result;
use crate::net::Transport;
use crate::node::NodeData;
use crate::sync::SyncField;
use crate::types::*;

/// Bit flags describing which edge endpoints a local replica stands for.
pub type RoleMask = u8;
pub const SOURCE: RoleMask = 0b01;
pub const DESTINATION: RoleMask = 0b10;

/// Replica selector for the write and read sides of a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Replicas that are the tail of a local edge.
    Source,
    /// Replicas that are the head of a local edge.
    Destination,
    Any,
}

impl Role {
    #[inline]
    pub fn matches(self, mask: RoleMask) -> bool {
        match self {
            Role::Source => mask & SOURCE != 0,
            Role::Destination => mask & DESTINATION != 0,
            Role::Any => true,
        }
    }
}

/// How an owner folds a replica's value into the canonical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Min,
    Add,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Only entries flagged in the field's dirty set travel.
    Dirty,
    Unfiltered,
}

/// One host's view of a graph partitioned across hosts.
///
/// Local ids `0..num_owned()` are the nodes this host owns; the remaining ids
/// up to `num_local()` are mirrors of nodes owned elsewhere.
pub trait PartitionedGraph: Sync {
    type Transport: Transport;

    fn transport(&self) -> &Self::Transport;

    fn host_id(&self) -> HostId {
        self.transport().host_id()
    }

    fn num_hosts(&self) -> usize {
        self.transport().num_hosts()
    }

    /// Node count of the whole graph.
    fn total_nodes(&self) -> usize;
    fn num_owned(&self) -> usize;
    fn num_local(&self) -> usize;

    fn global_id(&self, lid: LocalId) -> NodeId;
    fn local_id(&self, gid: NodeId) -> Option<LocalId>;

    fn is_local(&self, gid: NodeId) -> bool {
        self.local_id(gid).is_some()
    }

    fn is_owned(&self, gid: NodeId) -> bool;

    /// Heads of the local out-edges of `lid`, as local ids.
    fn edges(&self, lid: LocalId) -> &[LocalId];

    /// True when one node may be a source replica on one host and a
    /// destination replica on another, which makes filtered syncs unsound.
    fn is_vertex_cut(&self) -> bool;

    fn data(&self, lid: LocalId) -> &NodeData;
    fn bitsets(&self) -> &Bitsets;

    /// Reduce replicas matching `write` into the owner, then broadcast the
    /// owner's value to replicas matching `read`. Blocking and collective:
    /// every host must issue the same call.
    fn sync<F: SyncField>(&self, write: Role, read: Role, reduce: Reduce, filter: Filter) -> Result<()>;
}
