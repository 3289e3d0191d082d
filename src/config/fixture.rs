use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_FIXTURE_PREFIX;
use crate::constants::DEFAULT_MIN_REPLICATION_FACTOR;
use crate::constants::DEFAULT_PLAIN_FIXTURE_PREFIX;
use crate::constants::DEFAULT_REPLICATION_FACTOR;
use crate::ClusterConfig;
use crate::ConfigFixture;
use crate::Error;
use crate::Result;
use crate::ShardingMode;

/// Names and cluster options of the databases a run creates
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FixtureConfig {
    /// Prefix of the cluster-configured pair (`<prefix>Src`, `<prefix>Dst`)
    /// Default: "UnitTestsDumpProperties1"
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Prefix of the pair created without cluster options
    /// Default: "UnitTestsDump"
    #[serde(default = "default_plain_prefix")]
    pub plain_prefix: String,

    /// Default: flexible
    #[serde(default = "default_sharding")]
    pub sharding: ShardingMode,

    /// Default: 3
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,

    /// Default: 2
    #[serde(default = "default_min_replication_factor")]
    pub min_replication_factor: u32,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            plain_prefix: default_plain_prefix(),
            sharding: default_sharding(),
            replication_factor: default_replication_factor(),
            min_replication_factor: default_min_replication_factor(),
        }
    }
}

impl FixtureConfig {
    pub fn cluster_config(&self) -> Result<ClusterConfig> {
        ClusterConfig::new(
            self.sharding,
            self.replication_factor,
            self.min_replication_factor,
        )
    }

    pub fn cluster_fixture(&self) -> Result<ConfigFixture> {
        Ok(ConfigFixture::new(self.prefix.clone(), self.cluster_config()?))
    }

    pub fn plain_fixture(&self) -> ConfigFixture {
        ConfigFixture::plain(self.plain_prefix.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() || self.plain_prefix.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "fixture prefixes cannot be empty".into(),
            )));
        }

        if self.prefix == self.plain_prefix {
            return Err(Error::Config(ConfigError::Message(format!(
                "fixture.prefix and fixture.plain_prefix must differ, both are {:?}",
                self.prefix
            ))));
        }

        self.cluster_config().map(|_| ())
    }
}

fn default_prefix() -> String {
    DEFAULT_FIXTURE_PREFIX.to_string()
}
fn default_plain_prefix() -> String {
    DEFAULT_PLAIN_FIXTURE_PREFIX.to_string()
}
fn default_sharding() -> ShardingMode {
    ShardingMode::Flexible
}
fn default_replication_factor() -> u32 {
    DEFAULT_REPLICATION_FACTOR
}
fn default_min_replication_factor() -> u32 {
    DEFAULT_MIN_REPLICATION_FACTOR
}
