use std::time::Duration;

use reqwest::redirect;

use super::HttpAdminClient;
use crate::ClientConfig;
use crate::HttpError;
use crate::Result;

pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new builder with default config and the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                endpoint: endpoint.into(),
                ..ClientConfig::default()
            },
        }
    }

    /// Basic auth user; empty disables authentication (default: root)
    pub fn username(
        mut self,
        username: impl Into<String>,
    ) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(
        mut self,
        password: impl Into<String>,
    ) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set connection timeout (default: 1s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set request timeout (default: 10s)
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enable/disable gzip negotiation (default: disabled)
    pub fn enable_compression(
        mut self,
        enable: bool,
    ) -> Self {
        self.config.enable_compression = enable;
        self
    }

    /// Completely replaces the configuration, including the endpoint
    ///
    /// Discards everything set through the individual methods before it.
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Build the client with current configuration
    pub fn build(self) -> Result<HttpAdminClient> {
        self.config.validate()?;

        let http = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.request_timeout())
            .redirect(redirect::Policy::none())
            .gzip(self.config.enable_compression)
            .build()
            .map_err(|e| HttpError::InvalidEndpoint(format!("{}: {e}", self.config.endpoint)))?;

        Ok(HttpAdminClient {
            http,
            config: self.config,
        })
    }
}
