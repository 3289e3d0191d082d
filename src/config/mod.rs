//! Configuration management for the verifier.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`CLUSTERPROBE__` prefix)
//! - Section-wise validation
mod client;
mod fixture;
mod migration;
mod poll;
pub use client::*;
pub use fixture::*;
pub use migration::*;
pub use poll::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "CLUSTERPROBE";

/// Main configuration container
///
/// Merge order (later sources override earlier):
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProbeConfig {
    /// Admin API connection settings
    #[serde(default)]
    pub client: ClientConfig,
    /// Bounds for waiting on asynchronous effects
    #[serde(default)]
    pub poll: PollPolicy,
    /// Database names and the cluster config they are created with
    #[serde(default)]
    pub fixture: FixtureConfig,
    /// External dump/restore step
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl ProbeConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Validation is deferred so callers can apply further overrides via
    /// [`with_override_config`](ProbeConfig::with_override_config); call
    /// [`validate`](ProbeConfig::validate) before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "probe.toml");
    /// std::env::set_var("CLUSTERPROBE__CLIENT__ENDPOINT", "http://db1:8529");
    /// let cfg = ProbeConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies overrides from `path` on top of the current values.
    ///
    /// Environment variables are re-applied last so they keep the highest
    /// priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.client.validate()?;
        self.poll.validate()?;
        self.fixture.validate()?;
        self.migration.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("migration.command")
}
