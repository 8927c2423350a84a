/// Splits an edge list into per-host partitions (removes self-loops and parallel edges)
pub mod builder;
/// Runs every host of a partitioned graph as a thread
pub mod cluster;
/// Run and cluster configuration, loadable from TOML
pub mod config;
pub mod error;
/// Serial and rayon-backed loops over local nodes
pub mod exec;
/// Generates uniform random edge lists `Vec<(u, v)>`
pub mod generator;
/// The host-local graph interface every phase is written against
pub mod graph;
/// Host-to-host messaging and distributed accumulators
pub mod net;
/// Per-node labels
pub mod node;
/// A host's partition and its in-process graph
pub mod partition;
/// A sliding queue implementation using iterators
pub mod slidingqueue;
/// Replica synchronization of node fields
pub mod sync;
/// Common types for nodes, edges and hosts
pub mod types;

pub mod bitset;
mod timer;

/// # Betweenness Centrality (BC) - distributed Brandes
pub mod bc;
/// # Breadth-First Search (BFS) - level synchronous, from one source
pub mod bfs;
/// # Shortest-path DAG successor and predecessor counts
pub mod dag;
/// # Brandes dependency propagation
pub mod dependency;
/// # Shortest-path counting
pub mod paths;

pub use bc::{compute_bc, BcReport};
pub use cluster::Cluster;
pub use config::{BcConfig, ClusterConfig, PartitionPolicy, SourceRange};
pub use error::{Error, Result};
