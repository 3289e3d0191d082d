use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// External dump/restore step.
///
/// `command[0]` is the program, the rest its arguments. `{source}`,
/// `{destination}` and `{endpoint}` are substituted before spawning. An empty
/// command disables the migration leg; only the source round trip is checked.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MigrationConfig {
    #[serde(default)]
    pub command: Vec<String>,

    /// Maximum run time of the command (unit: milliseconds)
    /// Default: 300000
    #[serde(default = "default_migration_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_ms: default_migration_timeout_ms(),
        }
    }
}

impl MigrationConfig {
    pub fn is_disabled(&self) -> bool {
        self.command.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(program) = self.command.first() {
            if program.trim().is_empty() {
                return Err(Error::Config(ConfigError::Message(
                    "migration.command program cannot be blank".into(),
                )));
            }
        }

        if self.timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "migration.timeout_ms must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_migration_timeout_ms() -> u64 {
    300_000
}
