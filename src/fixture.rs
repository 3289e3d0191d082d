//! Declarative fixture data: the cluster configuration a database is created
//! with, and the source/destination names a migration case works on.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DESTINATION_SUFFIX;
use crate::constants::SOURCE_SUFFIX;
use crate::Result;
use crate::SetupError;

/// Server-level default distribution policy for collections of a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardingMode {
    Single,
    Flexible,
}

impl ShardingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardingMode::Single => "single",
            ShardingMode::Flexible => "flexible",
        }
    }
}

impl fmt::Display for ShardingMode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShardingMode {
    type Err = String;

    /// Exact match only; "Flexible" or " flexible" are rejected.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single" => Ok(ShardingMode::Single),
            "flexible" => Ok(ShardingMode::Flexible),
            other => Err(format!("unknown sharding mode: {other:?}")),
        }
    }
}

/// Cluster properties a database is created with.
///
/// Immutable after construction; `min_replication_factor <= replication_factor`
/// and both are positive, checked in [`ClusterConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    sharding: ShardingMode,
    replication_factor: u32,
    min_replication_factor: u32,
}

impl ClusterConfig {
    pub fn new(
        sharding: ShardingMode,
        replication_factor: u32,
        min_replication_factor: u32,
    ) -> Result<Self> {
        if replication_factor == 0 || min_replication_factor == 0 {
            return Err(SetupError::ZeroReplicationFactor.into());
        }
        if min_replication_factor > replication_factor {
            return Err(SetupError::InvalidClusterConfig {
                replication_factor,
                min_replication_factor,
            }
            .into());
        }
        Ok(Self {
            sharding,
            replication_factor,
            min_replication_factor,
        })
    }

    pub fn sharding(&self) -> ShardingMode {
        self.sharding
    }

    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }

    pub fn min_replication_factor(&self) -> u32 {
        self.min_replication_factor
    }

    /// Copy with a different sharding mode
    pub fn with_sharding(
        self,
        sharding: ShardingMode,
    ) -> Self {
        Self { sharding, ..self }
    }

    /// Copy with different replication factors, re-checking the invariant
    pub fn with_replication(
        self,
        replication_factor: u32,
        min_replication_factor: u32,
    ) -> Result<Self> {
        Self::new(self.sharding, replication_factor, min_replication_factor)
    }
}

/// A database as known to the verifying process.
///
/// `config` is `None` for databases created without cluster options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHandle {
    pub name: String,
    pub config: Option<ClusterConfig>,
}

impl DatabaseHandle {
    pub fn new(
        name: impl Into<String>,
        config: Option<ClusterConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// Source/destination pair sharing a name prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFixture {
    prefix: String,
    config: Option<ClusterConfig>,
}

impl ConfigFixture {
    pub fn new(
        prefix: impl Into<String>,
        config: ClusterConfig,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            config: Some(config),
        }
    }

    /// Pair whose databases carry no cluster options
    pub fn plain(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            config: None,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn config(&self) -> Option<ClusterConfig> {
        self.config
    }

    /// `<prefix>Src`
    pub fn source_name(&self) -> String {
        format!("{}{}", self.prefix, SOURCE_SUFFIX)
    }

    /// `<prefix>Dst`
    pub fn destination_name(&self) -> String {
        format!("{}{}", self.prefix, DESTINATION_SUFFIX)
    }

    pub fn source(&self) -> DatabaseHandle {
        DatabaseHandle::new(self.source_name(), self.config)
    }

    /// The destination is expected to end up with the source's config
    pub fn destination(&self) -> DatabaseHandle {
        DatabaseHandle::new(self.destination_name(), self.config)
    }
}
