//! Verification cases and the driver that runs them.
//!
//! Every case gets its own [`Teardown`], which runs whether the case passed,
//! failed or panicked. Cases report independently; one failing case never
//! stops the next from running.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::SYSTEM_DATABASE;
use crate::setup::prepare_fixture;
use crate::ConfigFixture;
use crate::ConsistencyVerifier;
use crate::Error;
use crate::Migration;
use crate::PollPolicy;
use crate::ProbeConfig;
use crate::Result;
use crate::RouteActivation;
use crate::RoutingRule;
use crate::Session;
use crate::Teardown;
use crate::TeardownReport;

pub const DATABASE_PROPERTIES_CASE: &str = "database-properties";
pub const ROUTING_RELOAD_CASE: &str = "routing-reload";

/// Scope note of a properties case that had no migration to check
pub const ROUND_TRIP_ONLY: &str = "round trip only";

const DEFAULT_ROUTE_MATCH: &str = "/hello/world";
const DEFAULT_ROUTE_CONTENT_TYPE: &str = "text/html";
const DEFAULT_ROUTE_BODY: &str = "moo!";

#[async_trait]
pub trait VerificationCase: Send + Sync {
    fn name(&self) -> &str;

    /// Set when the case checks less than its name promises
    fn scope_note(&self) -> Option<&'static str> {
        None
    }

    /// Registers everything it creates with `teardown` as soon as it exists
    async fn run(
        &self,
        session: &mut Session,
        teardown: &mut Teardown,
    ) -> Result<()>;
}

#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Failed(Error),
}

#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
    pub cleanup: TeardownReport,
    pub elapsed: Duration,
    /// e.g. "round trip only" when no migration ran
    pub scope_note: Option<&'static str>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed)
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            CaseOutcome::Passed => None,
            CaseOutcome::Failed(e) => Some(e),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs `case` and then, unconditionally, its teardown.
pub async fn run_case(
    case: &dyn VerificationCase,
    session: &mut Session,
) -> CaseReport {
    let started = Instant::now();
    let name = case.name().to_string();
    info!("case {name}: started");

    let mut teardown = Teardown::begin(session);
    let result = AssertUnwindSafe(case.run(session, &mut teardown)).catch_unwind().await;

    let outcome = match result {
        Ok(Ok(())) => CaseOutcome::Passed,
        Ok(Err(e)) => CaseOutcome::Failed(e),
        Err(payload) => CaseOutcome::Failed(Error::Fatal(format!("case panicked: {}", panic_message(payload.as_ref())))),
    };

    let cleanup = teardown.run(session).await;
    if !cleanup.is_clean() {
        warn!("case {name}: teardown left {} failure(s)", cleanup.failures.len());
    }

    let report = CaseReport {
        name,
        outcome,
        cleanup,
        elapsed: started.elapsed(),
        scope_note: case.scope_note(),
    };
    match &report.outcome {
        CaseOutcome::Passed => match report.scope_note {
            Some(note) => info!("case {}: passed ({note}) in {:?}", report.name, report.elapsed),
            None => info!("case {}: passed in {:?}", report.name, report.elapsed),
        },
        CaseOutcome::Failed(e) => error!("case {}: FAILED: {e}", report.name),
    }
    report
}

/// Cluster properties survive a dump/restore.
///
/// Prepares both fixture pairs, checks the source reads back as created,
/// migrates the cluster pair and verifies the destination. Without a
/// migration only the source round trip is checked.
pub struct DatabasePropertiesCase {
    cluster: ConfigFixture,
    plain: ConfigFixture,
    migration: Option<Arc<dyn Migration>>,
    keep_databases: bool,
    verifier: ConsistencyVerifier,
}

impl DatabasePropertiesCase {
    pub fn new(
        cluster: ConfigFixture,
        plain: ConfigFixture,
        migration: Option<Arc<dyn Migration>>,
    ) -> Self {
        Self {
            cluster,
            plain,
            migration,
            keep_databases: false,
            verifier: ConsistencyVerifier::new(),
        }
    }

    /// Leave the fixture databases on the server for inspection
    pub fn keep_databases(
        mut self,
        keep: bool,
    ) -> Self {
        self.keep_databases = keep;
        self
    }
}

#[async_trait]
impl VerificationCase for DatabasePropertiesCase {
    fn name(&self) -> &str {
        DATABASE_PROPERTIES_CASE
    }

    fn scope_note(&self) -> Option<&'static str> {
        self.migration.is_none().then_some(ROUND_TRIP_ONLY)
    }

    async fn run(
        &self,
        session: &mut Session,
        teardown: &mut Teardown,
    ) -> Result<()> {
        let expected = self
            .cluster
            .config()
            .ok_or_else(|| Error::Fatal(format!("fixture {} has no cluster config", self.cluster.prefix())))?;
        let api = session.api().clone();

        for fixture in [&self.plain, &self.cluster] {
            if !self.keep_databases {
                teardown.drop_database(fixture.source_name());
                teardown.drop_database(fixture.destination_name());
            }
            prepare_fixture(api.as_ref(), fixture, fixture.config().is_none()).await?;
        }

        let source = self.cluster.source();
        let destination = self.cluster.destination();

        self.verifier.verify(session, &source, &expected).await?;

        let Some(migration) = &self.migration else {
            info!("no migration configured; {} checked by round trip only", source.name);
            return Ok(());
        };
        migration.migrate(&source, &destination).await?;
        self.verifier.verify(session, &destination, &expected).await
    }
}

/// A routing rule is inactive until reloaded, then serves its content.
pub struct RoutingReloadCase {
    database: String,
    rule: RoutingRule,
    policy: PollPolicy,
}

impl RoutingReloadCase {
    pub fn new(
        database: impl Into<String>,
        rule: RoutingRule,
        policy: PollPolicy,
    ) -> Self {
        Self {
            database: database.into(),
            rule,
            policy,
        }
    }
}

#[async_trait]
impl VerificationCase for RoutingReloadCase {
    fn name(&self) -> &str {
        ROUTING_RELOAD_CASE
    }

    async fn run(
        &self,
        session: &mut Session,
        teardown: &mut Teardown,
    ) -> Result<()> {
        session.use_database(&self.database).await?;

        let mut activation = RouteActivation::new(
            session.api().clone(),
            session.current(),
            self.rule.clone(),
            self.policy,
        );
        activation.baseline_reload().await?;
        activation.insert(teardown).await?;

        if activation.observe_now().await?.is_effective() {
            return Err(Error::Fatal(format!(
                "routing rule {} served traffic before any reload",
                self.rule.url_match
            )));
        }

        activation.activate().await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|r| !r.passed())
    }
}

#[derive(Default)]
pub struct Suite {
    cases: Vec<Box<dyn VerificationCase>>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two canonical cases, parameterized by `config`
    pub fn from_config(
        config: &ProbeConfig,
        migration: Option<Arc<dyn Migration>>,
        keep_databases: bool,
    ) -> Result<Self> {
        let properties = DatabasePropertiesCase::new(
            config.fixture.cluster_fixture()?,
            config.fixture.plain_fixture(),
            migration,
        )
        .keep_databases(keep_databases);

        let routing = RoutingReloadCase::new(
            SYSTEM_DATABASE,
            RoutingRule::new(DEFAULT_ROUTE_MATCH, DEFAULT_ROUTE_CONTENT_TYPE, DEFAULT_ROUTE_BODY),
            config.poll,
        );

        Ok(Self::new().with_case(properties).with_case(routing))
    }

    pub fn with_case(
        mut self,
        case: impl VerificationCase + 'static,
    ) -> Self {
        self.cases.push(Box::new(case));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name()).collect()
    }

    /// Runs the cases named in `only`, or all of them when `only` is empty.
    ///
    /// # Errors
    /// [`Error::Fatal`] for a name no case carries; nothing runs in that case.
    pub async fn run(
        &self,
        session: &mut Session,
        only: &[String],
    ) -> Result<SuiteReport> {
        let names = self.names();
        if let Some(unknown) = only.iter().find(|n| !names.contains(&n.as_str())) {
            return Err(Error::Fatal(format!(
                "unknown case {unknown}; available: {}",
                names.join(", ")
            )));
        }

        let mut report = SuiteReport::default();
        for case in &self.cases {
            if only.is_empty() || only.iter().any(|n| n == case.name()) {
                report.cases.push(run_case(case.as_ref(), session).await);
            }
        }
        Ok(report)
    }
}
