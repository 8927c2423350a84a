use crate::types::{HostId, NodeId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An algorithmic invariant broke; the run cannot continue.
    #[error("invariant violated on node {node}: trim {trim} exceeds {field} {count}")]
    InvariantViolation {
        node: NodeId,
        field: &'static str,
        trim: u32,
        count: u32,
    },

    #[error("host {peer} disconnected during `{label}`")]
    Disconnected { peer: HostId, label: &'static str },

    #[error("timed out waiting on host {peer} during `{label}`")]
    Timeout { peer: HostId, label: &'static str },

    /// Hosts issued collectives in different orders.
    #[error("collective mismatch with host {peer}: expected `{expected}`, got `{got}`")]
    CollectiveMismatch {
        peer: HostId,
        expected: &'static str,
        got: &'static str,
    },

    #[error("source node {node} out of range ({total} nodes)")]
    SourceOutOfRange { node: NodeId, total: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("host {0} panicked")]
    HostPanicked(HostId),
}

pub type Result<T> = std::result::Result<T, Error>;
