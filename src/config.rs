use crate::error::{Error, Result};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;
use std::path::Path;

const DEFAULT_MAX_ROUNDS: u32 = 10_000;
const DEFAULT_HOSTS: usize = 2;

/// Which source nodes the BC run iterates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRange {
    Single { source: NodeId },
    Count { start: NodeId, count: usize },
    All {
        #[serde(default)]
        start: NodeId,
    },
}

impl Default for SourceRange {
    fn default() -> Self {
        SourceRange::All { start: 0 }
    }
}

impl SourceRange {
    /// Resolves to a concrete id range over a graph of `total` nodes.
    pub fn resolve(&self, total: usize) -> Result<Range<NodeId>> {
        match *self {
            SourceRange::Single { source } if source < total => Ok(source..source + 1),
            SourceRange::Count { start, count } if start < total => {
                Ok(start..start.saturating_add(count).min(total))
            }
            SourceRange::All { start } if start < total || (start == 0 && total == 0) => {
                Ok(start..total)
            }
            SourceRange::Single { source: node }
            | SourceRange::Count { start: node, .. }
            | SourceRange::All { start: node } => Err(Error::SourceOutOfRange { node, total }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BcConfig {
    #[serde(default)]
    pub sources: SourceRange,
    /// Upper bound on rounds of every fixed-point loop.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Restrict syncs to entries flagged in the per-field dirty sets.
    #[serde(default = "default_true")]
    pub dirty_bitsets: bool,
}

impl Default for BcConfig {
    fn default() -> Self {
        Self {
            sources: SourceRange::default(),
            max_rounds: default_max_rounds(),
            dirty_bitsets: default_true(),
        }
    }
}

impl BcConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_sources(mut self, sources: SourceRange) -> Self {
        self.sources = sources;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::Config("`max_rounds` must be at least 1".into()));
        }
        Ok(())
    }
}

/// How edges are placed on hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// Every edge lives with the owner of its tail.
    EdgeCut,
    /// Edges are hashed across hosts; replicas may play both roles.
    VertexCut,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        PartitionPolicy::EdgeCut
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_hosts")]
    pub hosts: usize,
    /// Worker threads per host; `None` runs every pass on the host thread.
    #[serde(default)]
    pub threads_per_host: Option<usize>,
    #[serde(default)]
    pub partition: PartitionPolicy,
    /// Receive timeout for collectives; `None` blocks forever.
    #[serde(default)]
    pub sync_timeout_ms: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            threads_per_host: None,
            partition: PartitionPolicy::default(),
            sync_timeout_ms: None,
        }
    }
}

impl ClusterConfig {
    pub fn new(hosts: usize, partition: PartitionPolicy) -> Self {
        Self {
            hosts,
            partition,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads_per_host = Some(threads);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosts == 0 {
            return Err(Error::Config("`hosts` must be at least 1".into()));
        }
        if self.threads_per_host == Some(0) {
            return Err(Error::Config("`threads_per_host` must be at least 1".into()));
        }
        Ok(())
    }
}

/// Both configurations as read from one TOML file with `[cluster]` and `[bc]`
/// tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub bc: BcConfig,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.cluster.validate()?;
        config.bc.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_hosts() -> usize {
    DEFAULT_HOSTS
}
