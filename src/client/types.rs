use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ClusterConfig;
use crate::HttpError;
use crate::Result;
use crate::ShardingMode;

/// `{"error": false, "code": 200, "result": ...}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub(crate) result: T,
}

/// Properties of one database as the server reports them.
///
/// Cluster fields are kept as raw JSON so a server answering `"3"` where `3`
/// is expected shows up as a divergence instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseProperties {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub is_system: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replication_factor: Option<Value>,

    /// Newer servers name the minimum replication factor `writeConcern`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_concern: Option<Value>,
}

impl DatabaseProperties {
    /// `minReplicationFactor`, falling back to `writeConcern`
    pub fn effective_min_replication_factor(&self) -> Option<&Value> {
        self.min_replication_factor.as_ref().or(self.write_concern.as_ref())
    }

    /// Strict conversion: sharding must be a known mode, factors must be JSON integers.
    pub fn to_cluster_config(&self) -> Result<ClusterConfig> {
        let sharding = self
            .sharding
            .as_deref()
            .ok_or_else(|| self.decode_error("sharding is absent"))?
            .parse::<ShardingMode>()
            .map_err(|e| self.decode_error(&e))?;

        let replication_factor = self.integer_field("replicationFactor", self.replication_factor.as_ref())?;
        let min_replication_factor =
            self.integer_field("minReplicationFactor", self.effective_min_replication_factor())?;

        ClusterConfig::new(sharding, replication_factor, min_replication_factor)
    }

    fn integer_field(
        &self,
        field: &str,
        value: Option<&Value>,
    ) -> Result<u32> {
        value
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.decode_error(&format!("{field} is not an integer: {value:?}")))
    }

    fn decode_error(
        &self,
        message: &str,
    ) -> crate::Error {
        HttpError::Decode {
            path: format!("database {}", self.name),
            message: message.to_string(),
        }
        .into()
    }
}

/// Body of a collection create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOptions {
    pub name: String,

    pub is_system: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribute_shards_like: Option<String>,
}

impl CollectionOptions {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            is_system: name.starts_with('_'),
            name,
            distribute_shards_like: None,
        }
    }

    pub fn distribute_shards_like(
        mut self,
        collection: impl Into<String>,
    ) -> Self {
        self.distribute_shards_like = Some(collection.into());
        self
    }
}

/// Handle of an inserted document together with the status the insert got
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InsertedDocument {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_key")]
    pub key: String,

    #[serde(rename = "_rev", default)]
    pub rev: String,

    /// Filled from the HTTP status, not the body
    #[serde(skip)]
    pub status: u16,
}

/// Status, headers and body of a GET, whatever the status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn header(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_contains(
        &self,
        needle: &str,
    ) -> bool {
        self.body.contains(needle)
    }
}
