//! Cluster-configuration consistency checks.
//!
//! The verifier always reads the server's live properties; it never compares
//! against a cached expectation of what the server should hold.

use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::ClusterConfig;
use crate::DatabaseHandle;
use crate::DatabaseProperties;
use crate::Error;
use crate::FieldMismatch;
use crate::MismatchError;
use crate::Result;
use crate::Session;

pub const FIELD_SHARDING: &str = "sharding";
pub const FIELD_REPLICATION_FACTOR: &str = "replicationFactor";
pub const FIELD_MIN_REPLICATION_FACTOR: &str = "minReplicationFactor";

const ABSENT: &str = "<absent>";

/// Every field of `expected` that `observed` does not match exactly.
///
/// Sharding compares by exact string, replication factors by JSON integer
/// equality (so `"3"` or `3.0` never equals `3`).
pub fn compare(
    expected: &ClusterConfig,
    observed: &DatabaseProperties,
) -> Vec<FieldMismatch> {
    let mut mismatches = Vec::new();

    let sharding = expected.sharding().as_str();
    if observed.sharding.as_deref() != Some(sharding) {
        mismatches.push(FieldMismatch {
            field: FIELD_SHARDING,
            expected: format!("{sharding:?}"),
            actual: observed
                .sharding
                .as_ref()
                .map(|s| format!("{s:?}"))
                .unwrap_or_else(|| ABSENT.to_string()),
        });
    }

    check_integer(
        &mut mismatches,
        FIELD_REPLICATION_FACTOR,
        expected.replication_factor(),
        observed.replication_factor.as_ref(),
    );
    check_integer(
        &mut mismatches,
        FIELD_MIN_REPLICATION_FACTOR,
        expected.min_replication_factor(),
        observed.effective_min_replication_factor(),
    );

    mismatches
}

fn check_integer(
    mismatches: &mut Vec<FieldMismatch>,
    field: &'static str,
    expected: u32,
    observed: Option<&Value>,
) {
    let expected_value = Value::from(expected);
    if observed != Some(&expected_value) {
        mismatches.push(FieldMismatch {
            field,
            expected: expected_value.to_string(),
            actual: observed.map(Value::to_string).unwrap_or_else(|| ABSENT.to_string()),
        });
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyVerifier;

impl ConsistencyVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Asserts the destination's live properties equal `expected`.
    ///
    /// Switches `session` to the destination as part of the check; restoring
    /// the prior selection is the caller's teardown's job.
    ///
    /// # Errors
    /// - [`crate::SetupError::DatabaseNotFound`] if the destination does not exist
    /// - [`MismatchError`] listing every divergent field
    pub async fn verify(
        &self,
        session: &mut Session,
        destination: &DatabaseHandle,
        expected: &ClusterConfig,
    ) -> Result<()> {
        session.use_database(&destination.name).await?;
        let observed = session.properties().await?;

        let mismatches = compare(expected, &observed);
        if mismatches.is_empty() {
            info!("database {} matches {:?}", destination.name, expected);
            return Ok(());
        }

        let error = MismatchError {
            database: destination.name.clone(),
            mismatches,
        };
        warn!("{error}");
        Err(error.into())
    }

    /// Creates `handle` with its config and reads it straight back.
    ///
    /// `handle.config` must be set; the database must not exist yet.
    pub async fn verify_round_trip(
        &self,
        session: &mut Session,
        handle: &DatabaseHandle,
    ) -> Result<()> {
        let expected = handle
            .config
            .ok_or_else(|| Error::Fatal(format!("database {} has no cluster config to round-trip", handle.name)))?;

        session.api().create_database(&handle.name, Some(expected)).await?;
        self.verify(session, handle, &expected).await
    }
}
