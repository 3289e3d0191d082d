//! Admin client for the database's HTTP administration and document APIs
//!
//! Provides:
//! - [`AdminApi`] - The contract the verifier consumes
//! - [`HttpAdminClient`] - reqwest-backed implementation
//! - [`ClientBuilder`] - Configurable client construction
//!
//! Every call names its database explicitly; which database is "current" is
//! tracked by [`crate::Session`], not by the client.
//!
//! # Basic Usage
//! ```no_run
//! use clusterprobe::AdminApi;
//! use clusterprobe::ClientBuilder;
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = ClientBuilder::new("http://127.0.0.1:8529")
//!         .username("root")
//!         .request_timeout(Duration::from_secs(5))
//!         .build()
//!         .unwrap();
//!
//!     let props = client.database_properties("_system").await.unwrap();
//!     println!("sharding: {:?}", props.sharding);
//! }
//! ```

mod builder;
mod http_client;
mod request_timer;
mod types;

pub use builder::*;
pub use http_client::*;
pub use types::*;

#[cfg(test)]
mod types_test;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::ClusterConfig;
use crate::Result;

/// Operations the verifier needs from the database server.
///
/// Implementations surface server answers unchanged: "not found" as
/// [`crate::HttpError::NotFound`], a taken database name as
/// [`crate::SetupError::AlreadyExists`], any other unexpected status as
/// [`crate::HttpError::Status`]. Nothing here retries.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AdminApi: Send + Sync + 'static {
    /// Creates `name`, with cluster options when `config` is given
    async fn create_database(
        &self,
        name: &str,
        config: Option<ClusterConfig>,
    ) -> Result<()>;

    async fn drop_database(
        &self,
        name: &str,
    ) -> Result<()>;

    /// Live properties as reported by the server
    async fn database_properties(
        &self,
        database: &str,
    ) -> Result<DatabaseProperties>;

    async fn create_collection(
        &self,
        database: &str,
        options: CollectionOptions,
    ) -> Result<()>;

    async fn drop_collection(
        &self,
        database: &str,
        name: &str,
        is_system: bool,
    ) -> Result<()>;

    async fn insert_document(
        &self,
        database: &str,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<InsertedDocument>;

    /// `id` is the full document handle, `<collection>/<key>`
    async fn remove_document(
        &self,
        database: &str,
        id: &str,
    ) -> Result<()>;

    /// Fires the routing reload; the server may answer before the new table is live
    async fn trigger_routing_reload(
        &self,
        database: &str,
    ) -> Result<()>;

    /// GET on an absolute path. Never fails on status, only on transport.
    async fn raw_get(
        &self,
        path: &str,
        headers: Vec<(String, String)>,
    ) -> Result<RawResponse>;
}

/// `/_db/<database><path>`
pub fn database_path(
    database: &str,
    path: &str,
) -> String {
    format!("/_db/{database}{path}")
}
