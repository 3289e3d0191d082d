//! Idempotent fixture setup.
//!
//! A prior run may have crashed and left databases or collections behind, so
//! setup first makes sure names are free and tolerates them already being free.

use tracing::debug;
use tracing::info;

use crate::AdminApi;
use crate::CollectionOptions;
use crate::ConfigFixture;
use crate::DatabaseHandle;
use crate::Error;
use crate::HttpError;
use crate::Result;

/// Databases of one fixture after setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFixture {
    pub source: DatabaseHandle,
    pub destination: DatabaseHandle,
    /// False when the destination is left for the migration to create
    pub destination_created: bool,
}

/// Drops `name` if present.
///
/// Returns whether something was dropped. An absent database is not an error.
pub async fn ensure_absent(
    api: &dyn AdminApi,
    name: &str,
) -> Result<bool> {
    match api.drop_database(name).await {
        Ok(()) => {
            info!("dropped leftover database {name}");
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            debug!("database {name} already absent");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Creates a collection unless one with that name exists.
///
/// Returns whether this call created it.
pub async fn ensure_collection(
    api: &dyn AdminApi,
    database: &str,
    options: CollectionOptions,
) -> Result<bool> {
    let name = options.name.clone();
    match api.create_collection(database, options).await {
        Ok(()) => {
            debug!("created collection {database}/{name}");
            Ok(true)
        }
        Err(Error::Http(HttpError::Conflict { .. })) => {
            debug!("collection {database}/{name} already present");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Frees both names of `fixture` and creates the source with its config.
///
/// With `create_destination` the destination is created too (same config);
/// otherwise only its name is freed so a migration can create it.
pub async fn prepare_fixture(
    api: &dyn AdminApi,
    fixture: &ConfigFixture,
    create_destination: bool,
) -> Result<PreparedFixture> {
    let source = fixture.source();
    let destination = fixture.destination();

    ensure_absent(api, &source.name).await?;
    api.create_database(&source.name, source.config).await?;
    info!("created source database {} with {:?}", source.name, source.config);

    ensure_absent(api, &destination.name).await?;
    if create_destination {
        api.create_database(&destination.name, destination.config).await?;
        info!("created destination database {}", destination.name);
    }

    Ok(PreparedFixture {
        source,
        destination,
        destination_created: create_destination,
    })
}
