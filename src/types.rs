/// Stable, cluster-wide node identifier.
pub type NodeId = usize;
/// Index of a node (owned or mirror) inside one host's partition.
pub type LocalId = usize;
pub type HostId = usize;

pub type Edge = (NodeId, NodeId);
pub type EdgeList = Vec<Edge>;

/// Distance of a node not (yet) reached from the current source.
pub const INFINITY: u32 = u32::MAX / 4;
