//! Waiting on server-side changes that are accepted before they are applied.
//!
//! A routing reload returns as soon as the server has queued it. The new table
//! goes live on a schedule the caller cannot see, so the only way to assert on
//! it is bounded polling: probe, sleep at least the interval, give up at the
//! deadline with a [`TimeoutError`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep_until;
use tokio::time::timeout_at;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::AdminApi;
use crate::PollPolicy;
use crate::Result;
use crate::TimeoutError;

/// What one probe saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Effective,
    /// Not visible yet; the reason ends up in the timeout error
    Pending(String),
}

impl Observation {
    pub fn pending(reason: impl Into<String>) -> Self {
        Observation::Pending(reason.into())
    }

    pub fn is_effective(&self) -> bool {
        matches!(self, Observation::Effective)
    }
}

/// Polls `probe` until it reports [`Observation::Effective`] or `timeout` runs out.
///
/// Sleeps at least `interval` after each probe finishes, and never starts a
/// probe at or past the deadline. A probe still running at the deadline is
/// abandoned. Probe errors count as
/// "not yet": they are logged and remembered as the last observation.
///
/// Returns the number of probes issued.
pub async fn await_effect<F, Fut>(
    what: &str,
    mut probe: F,
    timeout: Duration,
    interval: Duration,
) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation>>,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempts: u32 = 0;
    let mut last_observation = String::from("never probed");

    loop {
        if Instant::now() >= deadline {
            break;
        }

        attempts += 1;
        match timeout_at(deadline, probe()).await {
            Ok(Ok(Observation::Effective)) => {
                info!(
                    "[:await_effect] {what} active after {attempts} probe(s), {:?}",
                    started.elapsed()
                );
                return Ok(attempts);
            }
            Ok(Ok(Observation::Pending(reason))) => {
                debug!("[:await_effect] {what} probe #{attempts}: {reason}");
                last_observation = reason;
            }
            Ok(Err(e)) => {
                warn!("[:await_effect] {what} probe #{attempts} failed: {e}");
                last_observation = e.to_string();
            }
            Err(_) => {
                last_observation = "probe still running at deadline".to_string();
                break;
            }
        }

        sleep_until((Instant::now() + interval).min(deadline)).await;
    }

    let error = TimeoutError {
        what: what.to_string(),
        waited: started.elapsed(),
        attempts,
        last_observation,
    };
    warn!("{error}");
    Err(error.into())
}

/// Triggers a database's routing reload and waits for its effects.
pub struct AsyncReloadWaiter {
    api: Arc<dyn AdminApi>,
    database: String,
    policy: PollPolicy,
}

impl AsyncReloadWaiter {
    pub fn new(
        api: Arc<dyn AdminApi>,
        database: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            api,
            database: database.into(),
            policy,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Returns once the server accepted the reload, not once it applied it.
    pub async fn trigger_reload(&self) -> Result<()> {
        self.api.trigger_routing_reload(&self.database).await?;
        debug!("[:AsyncReloadWaiter] reload accepted for {}", self.database);
        Ok(())
    }

    /// [`await_effect`] bounded by this waiter's policy
    pub async fn await_effect<F, Fut>(
        &self,
        what: &str,
        probe: F,
    ) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation>>,
    {
        await_effect(what, probe, self.policy.timeout(), self.policy.interval()).await
    }

    /// [`await_effect`] with bounds other than the policy's, e.g. a longer
    /// wait for a server known to reload slowly
    pub async fn await_effect_with<F, Fut>(
        &self,
        what: &str,
        probe: F,
        timeout: Duration,
        interval: Duration,
    ) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation>>,
    {
        await_effect(what, probe, timeout, interval).await
    }

    /// Trigger, then poll. No probe is issued before the trigger returned.
    pub async fn reload_and_await<F, Fut>(
        &self,
        what: &str,
        probe: F,
    ) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation>>,
    {
        self.trigger_reload().await?;
        self.await_effect(what, probe).await
    }
}
