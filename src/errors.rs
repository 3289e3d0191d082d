//! Verification Error Hierarchy
//!
//! Separates the three outcomes a verification case can report: broken setup,
//! configuration divergence after migration, and an asynchronous effect that
//! never materialized. Transport-level failures are kept apart so they propagate
//! unchanged to the caller.

use std::fmt;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fixture creation or database selection failed; aborts the case
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// Cluster properties diverged across the migration boundary
    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    /// An asynchronous effect never became observable
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Admin API transport or status failures
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Routing rule lifecycle event not allowed in the current state
    #[error("Illegal route transition: {event} while {from}")]
    IllegalTransition {
        from: &'static str,
        event: &'static str,
    },

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Error {
    /// True for "resource does not exist" answers, which idempotent drops and
    /// teardown swallow.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Http(HttpError::NotFound { .. }) | Error::Setup(SetupError::DatabaseNotFound { .. })
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Error::Mismatch(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Database {name} does not exist")]
    DatabaseNotFound { name: String },

    /// Name already taken; callers must drop first
    #[error("Database {name} already exists")]
    AlreadyExists { name: String },

    #[error(
        "Invalid cluster config: minReplicationFactor {min_replication_factor} exceeds replicationFactor {replication_factor}"
    )]
    InvalidClusterConfig {
        replication_factor: u32,
        min_replication_factor: u32,
    },

    #[error("Replication factors must be positive")]
    ZeroReplicationFactor,

    #[error("{operation} returned status {actual}, expected {expected}")]
    UnexpectedStatus {
        operation: &'static str,
        expected: u16,
        actual: u16,
    },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// One divergent `ClusterConfig` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: expected {}, actual {}", self.field, self.expected, self.actual)
    }
}

/// Every divergent field of one verification, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct MismatchError {
    pub database: String,
    pub mismatches: Vec<FieldMismatch>,
}

impl MismatchError {
    pub fn fields(&self) -> Vec<&'static str> {
        self.mismatches.iter().map(|m| m.field).collect()
    }
}

impl fmt::Display for MismatchError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "Database {} diverges in {} field(s): ",
            self.database,
            self.mismatches.len()
        )?;
        for (i, mismatch) in self.mismatches.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{what} never became active within {waited:?} ({attempts} probes, last: {last_observation})")]
pub struct TimeoutError {
    pub what: String,
    pub waited: Duration,
    pub attempts: u32,
    pub last_observation: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection refused, TLS, request timeout, body read failures
    #[error("Request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} conflicts with an existing resource")]
    Conflict { resource: String },

    /// Non-2xx status outside the set the operation expects
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
