//! Routing rule lifecycle.
//!
//! A rule document inserted into `_routing` does nothing until a reload has
//! been triggered and the server swapped its routing table. [`RouteState`]
//! tracks where a rule is in that lifecycle; [`RouteActivation`] drives it
//! against a live server.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::client::database_path;
use crate::constants::ROUTE_ACTIVE_STATUS;
use crate::constants::ROUTING_COLLECTION;
use crate::constants::ROUTING_DISTRIBUTE_SHARDS_LIKE;
use crate::constants::ROUTING_INSERT_ACCEPTED;
use crate::setup::ensure_collection;
use crate::AdminApi;
use crate::AsyncReloadWaiter;
use crate::CollectionOptions;
use crate::Error;
use crate::Observation;
use crate::PollPolicy;
use crate::RawResponse;
use crate::Result;
use crate::SetupError;
use crate::Teardown;

const BODY_PREVIEW_CHARS: usize = 80;

/// A static response served for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub url_match: String,
    pub content_type: String,
    pub body: String,
}

impl RoutingRule {
    pub fn new(
        url_match: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url_match: url_match.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Document stored in `_routing`
    pub fn to_document(&self) -> Value {
        json!({
            "url": { "match": self.url_match },
            "content": {
                "contentType": self.content_type,
                "body": self.body,
            },
        })
    }

    /// Active means: status 200 and the configured body somewhere in the response.
    pub fn observe(
        &self,
        response: &RawResponse,
    ) -> Observation {
        if response.status == ROUTE_ACTIVE_STATUS && response.body_contains(&self.body) {
            return Observation::Effective;
        }

        let preview: String = response.body.chars().take(BODY_PREVIEW_CHARS).collect();
        Observation::pending(format!(
            "GET {} answered {} with body {:?}",
            self.url_match, response.status, preview
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteState {
    Absent,
    Inserted { id: String },
    ReloadTriggered { id: String },
    Active { id: String },
    TimedOut { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    Inserted(String),
    ReloadTriggered,
    EffectObserved,
    WaitExhausted,
    Deleted,
}

impl RouteEvent {
    fn name(&self) -> &'static str {
        match self {
            RouteEvent::Inserted(_) => "Inserted",
            RouteEvent::ReloadTriggered => "ReloadTriggered",
            RouteEvent::EffectObserved => "EffectObserved",
            RouteEvent::WaitExhausted => "WaitExhausted",
            RouteEvent::Deleted => "Deleted",
        }
    }
}

impl RouteState {
    pub fn name(&self) -> &'static str {
        match self {
            RouteState::Absent => "Absent",
            RouteState::Inserted { .. } => "Inserted",
            RouteState::ReloadTriggered { .. } => "ReloadTriggered",
            RouteState::Active { .. } => "Active",
            RouteState::TimedOut { .. } => "TimedOut",
        }
    }

    /// Next state, or [`Error::IllegalTransition`].
    ///
    /// Only deletion leads back to `Absent`, and it is allowed from every
    /// state a document exists in.
    pub fn apply(
        &self,
        event: &RouteEvent,
    ) -> Result<RouteState> {
        let next = match (self, event) {
            (RouteState::Absent, RouteEvent::Inserted(id)) => RouteState::Inserted { id: id.clone() },
            (RouteState::Inserted { id }, RouteEvent::ReloadTriggered) => {
                RouteState::ReloadTriggered { id: id.clone() }
            }
            (RouteState::ReloadTriggered { id }, RouteEvent::EffectObserved) => RouteState::Active { id: id.clone() },
            (RouteState::ReloadTriggered { id }, RouteEvent::WaitExhausted) => RouteState::TimedOut { id: id.clone() },
            (state, RouteEvent::Deleted) if state.document_id().is_some() => RouteState::Absent,
            (state, event) => {
                return Err(Error::IllegalTransition {
                    from: state.name(),
                    event: event.name(),
                })
            }
        };
        Ok(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteState::Active { .. } | RouteState::TimedOut { .. })
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            RouteState::Absent => None,
            RouteState::Inserted { id }
            | RouteState::ReloadTriggered { id }
            | RouteState::Active { id }
            | RouteState::TimedOut { id } => Some(id),
        }
    }
}

impl fmt::Display for RouteState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.document_id() {
            Some(id) => write!(f, "{} ({id})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// Issues the rule's URL against the server and interprets the answer
#[derive(Clone)]
pub struct RouteProbe {
    api: Arc<dyn AdminApi>,
    path: String,
    rule: RoutingRule,
}

impl RouteProbe {
    pub fn new(
        api: Arc<dyn AdminApi>,
        database: &str,
        rule: RoutingRule,
    ) -> Self {
        // `/_db/_system/<url>` and the bare `<url>` reach the same route
        Self {
            api,
            path: database_path(database, &rule.url_match),
            rule,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn observe(&self) -> Result<Observation> {
        let response = self.api.raw_get(&self.path, Vec::new()).await?;
        Ok(self.rule.observe(&response))
    }
}

/// One routing rule driven through its lifecycle on a live server
pub struct RouteActivation {
    api: Arc<dyn AdminApi>,
    database: String,
    rule: RoutingRule,
    waiter: AsyncReloadWaiter,
    state: RouteState,
}

impl RouteActivation {
    pub fn new(
        api: Arc<dyn AdminApi>,
        database: impl Into<String>,
        rule: RoutingRule,
        policy: PollPolicy,
    ) -> Self {
        let database = database.into();
        Self {
            waiter: AsyncReloadWaiter::new(api.clone(), database.clone(), policy),
            api,
            database,
            rule,
            state: RouteState::Absent,
        }
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    pub fn rule(&self) -> &RoutingRule {
        &self.rule
    }

    pub fn probe(&self) -> RouteProbe {
        RouteProbe::new(self.api.clone(), &self.database, self.rule.clone())
    }

    fn transition(
        &mut self,
        event: RouteEvent,
    ) -> Result<()> {
        let next = self.state.apply(&event)?;
        info!("[:RouteActivation] {} {} -> {}", self.rule.url_match, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Reload before inserting so the run starts from the server's stored table
    pub async fn baseline_reload(&self) -> Result<()> {
        self.waiter.trigger_reload().await
    }

    /// Stores the rule document, creating `_routing` if needed.
    ///
    /// Everything created is registered with `teardown` before the insert
    /// status is checked.
    pub async fn insert(
        &mut self,
        teardown: &mut Teardown,
    ) -> Result<()> {
        self.state.apply(&RouteEvent::Inserted(String::new()))?;

        let options = CollectionOptions::new(ROUTING_COLLECTION).distribute_shards_like(ROUTING_DISTRIBUTE_SHARDS_LIKE);
        if ensure_collection(self.api.as_ref(), &self.database, options).await? {
            teardown.drop_collection(&self.database, ROUTING_COLLECTION, true);
        }

        let inserted = self
            .api
            .insert_document(&self.database, ROUTING_COLLECTION, self.rule.to_document())
            .await?;
        teardown.remove_document(&self.database, &inserted.id);
        debug!("[:RouteActivation] stored {} with status {}", inserted.id, inserted.status);

        if inserted.status != ROUTING_INSERT_ACCEPTED {
            return Err(SetupError::UnexpectedStatus {
                operation: "insert routing rule",
                expected: ROUTING_INSERT_ACCEPTED,
                actual: inserted.status,
            }
            .into());
        }

        self.transition(RouteEvent::Inserted(inserted.id))
    }

    /// Probes once without triggering anything
    pub async fn observe_now(&self) -> Result<Observation> {
        self.probe().observe().await
    }

    /// Triggers the reload and polls until the rule serves traffic.
    ///
    /// Ends in `Active`, or in `TimedOut` with the [`crate::TimeoutError`] returned.
    pub async fn activate(&mut self) -> Result<u32> {
        let triggered = self.state.apply(&RouteEvent::ReloadTriggered)?;
        self.waiter.trigger_reload().await?;
        info!("[:RouteActivation] {} {} -> {}", self.rule.url_match, self.state, triggered);
        self.state = triggered;

        let probe = self.probe();
        let what = format!("routing rule {}", self.rule.url_match);
        let result = self
            .waiter
            .await_effect(&what, move || {
                let probe = probe.clone();
                async move { probe.observe().await }
            })
            .await;

        match result {
            Ok(attempts) => {
                self.transition(RouteEvent::EffectObserved)?;
                Ok(attempts)
            }
            Err(e) if e.is_timeout() => {
                self.transition(RouteEvent::WaitExhausted)?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the rule document. A document already gone counts as deleted.
    pub async fn delete(&mut self) -> Result<()> {
        let Some(id) = self.state.document_id().map(str::to_string) else {
            return Err(Error::IllegalTransition {
                from: self.state.name(),
                event: RouteEvent::Deleted.name(),
            });
        };

        match self.api.remove_document(&self.database, &id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("[:RouteActivation] {id} already removed"),
            Err(e) => return Err(e),
        }
        self.transition(RouteEvent::Deleted)
    }
}
