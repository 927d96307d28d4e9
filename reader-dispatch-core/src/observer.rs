//! Awaiting quiescence of asynchronous handlers
//!
//! Async handlers settle outside the dispatch call that started them. The
//! [`Observer`] gives callers (usually tests) a rendezvous point: it waits
//! until the session's promise tracker reports nothing pending, then returns
//! a snapshot of what handlers dispatched.
//!
//! Waiting is bounded. Each retry waits up to [`ObserverConfig::interval`] for
//! the tracker's idle signal; after [`ObserverConfig::max_retries`] retries with
//! work still pending, observation fails instead of hanging.

use std::time::Duration;

use tokio::time::Instant;

use crate::action::Action;
use crate::error::ObserveError;
use crate::session::{Observation, Session};

/// Retry policy for [`Observer::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Longest wait per retry.
    pub interval: Duration,
    /// Retries before giving up.
    pub max_retries: u32,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            max_retries: 25,
        }
    }
}

impl ObserverConfig {
    /// Set the per-retry wait.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Upper bound on how long an observation can wait.
    ///
    /// Saturates at [`Duration::MAX`].
    pub fn total_wait(&self) -> Duration {
        self.interval.saturating_mul(self.max_retries)
    }
}

/// Waits for pending handler work, then snapshots observed actions.
///
/// Every call to [`observe`](Self::observe) starts a fresh wait.
#[derive(Debug, Clone)]
pub struct Observer<A: Action> {
    session: Session<A>,
    config: ObserverConfig,
}

impl<A: Action> Observer<A> {
    /// Create an observer for `session`.
    pub fn new(session: Session<A>, config: ObserverConfig) -> Self {
        Self { session, config }
    }

    /// The retry policy in use.
    pub fn config(&self) -> ObserverConfig {
        self.config
    }

    /// Wait until nothing is pending and return a snapshot.
    ///
    /// Fails with [`ObserveError::Unresolved`] once the retry budget is spent.
    pub async fn observe(&self) -> Result<Observation<A>, ObserveError> {
        let tracker = self.session.tracker();
        let started = Instant::now();
        let mut retries = 0;

        loop {
            let idle = tracker.idle();
            let pending = tracker.pending();

            if pending == 0 {
                tracing::debug!(retries, "no pending handlers, returning observed actions");
                return Ok(self.session.snapshot());
            }

            if retries >= self.config.max_retries {
                let waited = started.elapsed();
                tracing::warn!(pending, retries, ?waited, "pending handlers did not settle");
                return Err(ObserveError::Unresolved {
                    pending,
                    retries,
                    waited,
                });
            }

            tracing::trace!(pending, retries, "waiting for pending handlers");
            let _ = tokio::time::timeout(self.config.interval, idle).await;
            retries += 1;
        }
    }
}
