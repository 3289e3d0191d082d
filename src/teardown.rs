//! Scoped cleanup for one verification case.
//!
//! Actions are recorded as resources get created and undone in reverse order.
//! "Not found" answers are swallowed. If a `Teardown` is dropped without
//! [`Teardown::run`] having completed, its remaining server-side actions are
//! handed to the ambient tokio runtime.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::AdminApi;
use crate::Result;
use crate::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    DropDatabase {
        name: String,
    },
    DropCollection {
        database: String,
        name: String,
        is_system: bool,
    },
    RemoveDocument {
        database: String,
        id: String,
    },
}

impl fmt::Display for CleanupAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            CleanupAction::DropDatabase { name } => write!(f, "drop database {name}"),
            CleanupAction::DropCollection { database, name, .. } => {
                write!(f, "drop collection {database}/{name}")
            }
            CleanupAction::RemoveDocument { database, id } => write!(f, "remove document {database}/{id}"),
        }
    }
}

impl CleanupAction {
    async fn apply(
        &self,
        api: &dyn AdminApi,
    ) -> Result<()> {
        match self {
            CleanupAction::DropDatabase { name } => api.drop_database(name).await,
            CleanupAction::DropCollection {
                database,
                name,
                is_system,
            } => api.drop_collection(database, name, *is_system).await,
            CleanupAction::RemoveDocument { database, id } => api.remove_document(database, id).await,
        }
    }
}

/// Outcome of a completed teardown
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    /// Actions the server carried out
    pub applied: usize,
    /// Actions whose target was already gone
    pub already_absent: usize,
    /// Actions that failed for any other reason
    pub failures: Vec<String>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Cleanup actions of one case, undone by [`Teardown::run`].
///
/// Dropping a `Teardown` with actions left spawns a detached task for them.
/// Nothing awaits that task: if the runtime shuts down first, the remaining
/// resources stay on the server and no message is logged. [`crate::run_case`]
/// always calls `run`, so only callers managing a `Teardown` themselves can
/// end up on this path.
pub struct Teardown {
    api: Arc<dyn AdminApi>,
    prior_database: String,
    actions: Vec<CleanupAction>,
}

impl Teardown {
    /// Captures the session's current selection so it can be put back
    pub fn begin(session: &Session) -> Self {
        Self {
            api: session.api().clone(),
            prior_database: session.current().to_string(),
            actions: Vec::new(),
        }
    }

    pub fn prior_database(&self) -> &str {
        &self.prior_database
    }

    pub fn pending(&self) -> &[CleanupAction] {
        &self.actions
    }

    pub fn push(
        &mut self,
        action: CleanupAction,
    ) {
        debug!("[:Teardown] registered: {action}");
        self.actions.push(action);
    }

    pub fn drop_database(
        &mut self,
        name: impl Into<String>,
    ) {
        self.push(CleanupAction::DropDatabase { name: name.into() });
    }

    pub fn drop_collection(
        &mut self,
        database: impl Into<String>,
        name: impl Into<String>,
        is_system: bool,
    ) {
        self.push(CleanupAction::DropCollection {
            database: database.into(),
            name: name.into(),
            is_system,
        });
    }

    pub fn remove_document(
        &mut self,
        database: impl Into<String>,
        id: impl Into<String>,
    ) {
        self.push(CleanupAction::RemoveDocument {
            database: database.into(),
            id: id.into(),
        });
    }

    /// Undoes every recorded action, newest first, then restores the
    /// session's prior database selection. Never stops early.
    pub async fn run(
        mut self,
        session: &mut Session,
    ) -> TeardownReport {
        let mut report = TeardownReport::default();

        while let Some(action) = self.actions.pop() {
            match action.apply(self.api.as_ref()).await {
                Ok(()) => {
                    debug!("[:Teardown] {action}: done");
                    report.applied += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!("[:Teardown] {action}: already absent");
                    report.already_absent += 1;
                }
                Err(e) => {
                    warn!("[:Teardown] {action} failed: {e}");
                    report.failures.push(format!("{action}: {e}"));
                }
            }
        }

        session.restore(std::mem::take(&mut self.prior_database));
        report
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.actions.is_empty() {
            return;
        }

        let actions = std::mem::take(&mut self.actions);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!(
                    "[:Teardown] dropped with {} pending action(s), finishing in background",
                    actions.len()
                );
                let api = self.api.clone();
                handle.spawn(async move {
                    for action in actions.iter().rev() {
                        if let Err(e) = action.apply(api.as_ref()).await {
                            if !e.is_not_found() {
                                warn!("[:Teardown] background {action} failed: {e}");
                            }
                        }
                    }
                });
            }
            Err(_) => {
                for action in &actions {
                    warn!("[:Teardown] no runtime to finish {action}; resource left behind");
                }
            }
        }
    }
}
