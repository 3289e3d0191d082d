//! Per-session "current database" context.
//!
//! The selection lives here, on the caller's side, and is passed explicitly to
//! every admin call. Two drivers sharing one [`AdminApi`] each hold their own
//! `Session`, so switching databases in one never affects the other.

use std::sync::Arc;

use tracing::debug;

use crate::client::database_path;
use crate::constants::SYSTEM_DATABASE;
use crate::AdminApi;
use crate::DatabaseProperties;
use crate::RawResponse;
use crate::Result;
use crate::SetupError;

pub struct Session {
    api: Arc<dyn AdminApi>,
    current: String,
}

impl Session {
    /// Starts on the system database
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        Self::with_database(api, SYSTEM_DATABASE)
    }

    pub fn with_database(
        api: Arc<dyn AdminApi>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            api,
            current: database.into(),
        }
    }

    pub fn api(&self) -> &Arc<dyn AdminApi> {
        &self.api
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Selects `name` for subsequent calls on this session.
    ///
    /// # Errors
    /// [`SetupError::DatabaseNotFound`] if the server does not know `name`;
    /// the previous selection is kept in that case.
    pub async fn use_database(
        &mut self,
        name: &str,
    ) -> Result<()> {
        match self.api.database_properties(name).await {
            Ok(_) => {
                debug!("[:Session] current database {} -> {}", self.current, name);
                self.current = name.to_string();
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(SetupError::DatabaseNotFound { name: name.to_string() }.into()),
            Err(e) => Err(e),
        }
    }

    /// Puts back a selection captured earlier, without asking the server
    pub fn restore(
        &mut self,
        database: String,
    ) {
        if self.current != database {
            debug!("[:Session] restoring current database {} -> {}", self.current, database);
            self.current = database;
        }
    }

    /// Live properties of the current database
    pub async fn properties(&self) -> Result<DatabaseProperties> {
        self.api.database_properties(&self.current).await
    }

    /// GET `path` relative to the current database
    pub async fn get(
        &self,
        path: &str,
        headers: Vec<(String, String)>,
    ) -> Result<RawResponse> {
        self.api.raw_get(&database_path(&self.current, path), headers).await
    }
}
