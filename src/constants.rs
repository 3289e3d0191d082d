// -
// Admin API paths

pub(crate) const DATABASE_API: &str = "/_api/database";
pub(crate) const CURRENT_DATABASE_API: &str = "/_api/database/current";
pub(crate) const COLLECTION_API: &str = "/_api/collection";
pub(crate) const DOCUMENT_API: &str = "/_api/document";

/// Fires the asynchronous routing table reload
pub const ROUTING_RELOAD_PATH: &str = "/_admin/routing/reload";

/// Database every server carries; used when no other database is selected
pub const SYSTEM_DATABASE: &str = "_system";

// -
// Routing rules

/// System collection holding URL-to-response rules
pub const ROUTING_COLLECTION: &str = "_routing";

/// Collection whose shard distribution `_routing` follows in a cluster
pub(crate) const ROUTING_DISTRIBUTE_SHARDS_LIKE: &str = "_users";

/// Status the server answers a routing rule insert with: accepted, not yet effective
pub const ROUTING_INSERT_ACCEPTED: u16 = 202;

/// Status an activated custom route serves
pub const ROUTE_ACTIVE_STATUS: u16 = 200;

// -
// Fixture defaults

pub(crate) const DEFAULT_FIXTURE_PREFIX: &str = "UnitTestsDumpProperties1";
pub(crate) const DEFAULT_PLAIN_FIXTURE_PREFIX: &str = "UnitTestsDump";
pub(crate) const SOURCE_SUFFIX: &str = "Src";
pub(crate) const DESTINATION_SUFFIX: &str = "Dst";

pub(crate) const DEFAULT_REPLICATION_FACTOR: u32 = 3;
pub(crate) const DEFAULT_MIN_REPLICATION_FACTOR: u32 = 2;

// -
// Polling bounds

/// Smallest accepted overall wait for an asynchronous effect
pub(crate) const MIN_POLL_TIMEOUT_MS: u64 = 3000;

/// Smallest accepted spacing between two probes
pub(crate) const MIN_POLL_INTERVAL_MS: u64 = 500;
