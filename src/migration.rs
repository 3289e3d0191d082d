//! The dump/restore step between source and destination.
//!
//! The tool doing the actual copy lives outside this crate and is spawned from
//! a configured command line.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::info;

use crate::DatabaseHandle;
use crate::MigrationConfig;
use crate::Result;
use crate::SetupError;

const SOURCE_PLACEHOLDER: &str = "{source}";
const DESTINATION_PLACEHOLDER: &str = "{destination}";
const ENDPOINT_PLACEHOLDER: &str = "{endpoint}";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Migration: Send + Sync + 'static {
    /// Copies `source` into `destination`, creating the destination
    async fn migrate(
        &self,
        source: &DatabaseHandle,
        destination: &DatabaseHandle,
    ) -> Result<()>;
}

/// `None` when no command is configured
pub fn migration_from_config(
    config: &MigrationConfig,
    endpoint: &str,
) -> Option<Arc<dyn Migration>> {
    if config.is_disabled() {
        return None;
    }
    Some(Arc::new(CommandMigration::new(config, endpoint)))
}

/// Runs an external program, e.g. a dump piped into a restore
#[derive(Debug, Clone)]
pub struct CommandMigration {
    command: Vec<String>,
    endpoint: String,
    timeout: Duration,
}

impl CommandMigration {
    pub fn new(
        config: &MigrationConfig,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            command: config.command.clone(),
            endpoint: endpoint.into(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Command line with placeholders filled in
    pub fn render(
        &self,
        source: &DatabaseHandle,
        destination: &DatabaseHandle,
    ) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| {
                arg.replace(SOURCE_PLACEHOLDER, &source.name)
                    .replace(DESTINATION_PLACEHOLDER, &destination.name)
                    .replace(ENDPOINT_PLACEHOLDER, &self.endpoint)
            })
            .collect()
    }
}

#[async_trait]
impl Migration for CommandMigration {
    async fn migrate(
        &self,
        source: &DatabaseHandle,
        destination: &DatabaseHandle,
    ) -> Result<()> {
        let args = self.render(source, destination);
        let Some((program, rest)) = args.split_first() else {
            return Err(SetupError::Migration("no migration command configured".into()).into());
        };

        debug!("[:CommandMigration] spawning {:?}", args);
        let child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SetupError::Migration(format!("failed to spawn {program}: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| SetupError::Migration(format!("{program} failed: {e}")))?,
            Err(_) => {
                return Err(SetupError::Migration(format!(
                    "{program} did not finish within {:?}",
                    self.timeout
                ))
                .into())
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SetupError::Migration(format!("{program} exited with {}: {}", output.status, stderr.trim())).into());
        }

        info!("migrated {} -> {} via {program}", source.name, destination.name);
        Ok(())
    }
}
