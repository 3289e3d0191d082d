use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::MIN_POLL_INTERVAL_MS;
use crate::constants::MIN_POLL_TIMEOUT_MS;
use crate::Error;
use crate::Result;

/// Bounded polling used while an asynchronously applied change propagates
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Overall wait before reporting a timeout (unit: milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Spacing between two probes (unit: milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms < MIN_POLL_TIMEOUT_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "poll.timeout_ms must be at least {MIN_POLL_TIMEOUT_MS}ms, got {}",
                self.timeout_ms
            ))));
        }

        if self.interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "poll.interval_ms must be at least {MIN_POLL_INTERVAL_MS}ms, got {}",
                self.interval_ms
            ))));
        }

        if self.interval_ms >= self.timeout_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "poll.interval_ms {} should be less than poll.timeout_ms {}",
                self.interval_ms, self.timeout_ms
            ))));
        }

        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}
fn default_interval_ms() -> u64 {
    500
}
