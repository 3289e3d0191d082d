use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Admin API connection parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// Base URL of the coordinator/server
    /// Default: "http://127.0.0.1:8529"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Basic auth user; empty disables authentication
    /// Default: "root"
    #[serde(default = "default_username")]
    pub username: String,

    /// Default: ""
    #[serde(default)]
    pub password: String,

    /// Maximum time to establish a TCP connection
    /// Default: 1000ms
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum time for a complete request/response
    /// Default: 10000ms
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Advertise gzip in Accept-Encoding and decode transparently
    /// Default: false
    #[serde(default)]
    pub enable_compression: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: default_username(),
            password: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            enable_compression: false,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::Config(ConfigError::Message(format!(
                "client.endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            ))));
        }

        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client timeouts must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8529".to_string()
}
fn default_username() -> String {
    "root".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
