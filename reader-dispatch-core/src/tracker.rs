//! Pending-operation tracking for asynchronous handlers
//!
//! Every completion produced by a handler passes through [`PromiseTracker::track`].
//! Synchronous completions settle immediately; pending ones are spawned on the
//! current tokio runtime and counted until they settle, whether they succeed,
//! fail or panic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::effect::Completion;
use crate::error::DispatchError;

#[derive(Debug, Default)]
struct Counter {
    pending: usize,
    generation: u64,
}

#[derive(Debug, Default)]
struct TrackerInner {
    counter: Mutex<Counter>,
    idle: Notify,
}

/// Counts in-flight asynchronous handler invocations.
///
/// Cheap to clone; clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct PromiseTracker {
    inner: Arc<TrackerInner>,
}

impl PromiseTracker {
    /// Create a tracker with no pending operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations that have not settled yet.
    pub fn pending(&self) -> usize {
        self.inner.counter.lock().pending
    }

    /// Whether nothing is outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Current generation; bumped by [`reset`](Self::reset).
    pub fn generation(&self) -> u64 {
        self.inner.counter.lock().generation
    }

    /// A future that resolves the next time the counter drops to zero.
    ///
    /// Create it *before* checking [`pending`](Self::pending) so a transition
    /// between the check and the wait is not missed.
    pub fn idle(&self) -> Notified<'_> {
        self.inner.idle.notified()
    }

    /// Track a completion, ignoring its outcome.
    pub fn track(&self, completion: Completion) {
        self.track_with(completion, |_| {});
    }

    /// Track a completion and call `on_settle` with its outcome.
    ///
    /// `on_settle` runs immediately for synchronous completions. For pending
    /// ones it runs inside the spawned task, before the counter is
    /// decremented, and only if no [`reset`](Self::reset) happened meanwhile.
    pub fn track_with<F>(&self, completion: Completion, on_settle: F)
    where
        F: FnOnce(anyhow::Result<()>) + Send + 'static,
    {
        let future = match completion {
            Completion::Done => return on_settle(Ok(())),
            Completion::Failed(e) => return on_settle(Err(e)),
            Completion::Pending(future) => future,
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("async handler completion produced outside a tokio runtime");
                return on_settle(Err(DispatchError::NoRuntime.into()));
            }
        };

        let guard = self.acquire();
        tracing::trace!(pending = guard.tracker.pending(), "tracking pending handler");

        runtime.spawn(async move {
            let result = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(DispatchError::HandlerPanicked.into()),
            };
            if guard.is_current() {
                on_settle(result);
            }
            drop(guard);
        });
    }

    /// Forget all pending operations.
    ///
    /// Operations still running keep their old generation and will not
    /// decrement the fresh counter when they settle.
    pub fn reset(&self) {
        {
            let mut counter = self.inner.counter.lock();
            counter.pending = 0;
            counter.generation += 1;
        }
        self.inner.idle.notify_waiters();
    }

    fn acquire(&self) -> PendingGuard {
        let mut counter = self.inner.counter.lock();
        counter.pending += 1;
        PendingGuard {
            tracker: self.clone(),
            generation: counter.generation,
        }
    }
}

/// Decrements the counter on drop, so aborted tasks still settle.
struct PendingGuard {
    tracker: PromiseTracker,
    generation: u64,
}

impl PendingGuard {
    fn is_current(&self) -> bool {
        self.tracker.generation() == self.generation
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let now_idle = {
            let mut counter = self.tracker.inner.counter.lock();
            if counter.generation != self.generation {
                return;
            }
            counter.pending = counter.pending.saturating_sub(1);
            counter.pending == 0
        };
        tracing::trace!(now_idle, "pending handler settled");
        if now_idle {
            self.tracker.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sync_completion_not_counted() {
        let tracker = PromiseTracker::new();
        let settled = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&settled);

        tracker.track_with(Completion::Done, move |r| *slot.lock() = Some(r.is_ok()));

        assert_eq!(tracker.pending(), 0);
        assert_eq!(*settled.lock(), Some(true));
    }

    #[test]
    fn test_pending_without_runtime_fails() {
        let tracker = PromiseTracker::new();
        let settled = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&settled);

        tracker.track_with(Completion::pending(async { Ok(()) }), move |r| {
            *slot.lock() = Some(r.unwrap_err().to_string())
        });

        assert_eq!(tracker.pending(), 0);
        assert!(settled.lock().as_deref().unwrap().contains("runtime"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_until_settled() {
        let tracker = PromiseTracker::new();

        tracker.track(Completion::pending(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        }));
        tracker.track(Completion::pending(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(anyhow::anyhow!("rejected"))
        }));
        assert_eq!(tracker.pending(), 2);

        tokio::time::sleep(Duration::from_millis(75)).await;
        assert_eq!(tracker.pending(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_signal_fires() {
        let tracker = PromiseTracker::new();
        tracker.track(Completion::pending(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        }));

        let idle = tracker.idle();
        assert!(!tracker.is_idle());
        tokio::time::timeout(Duration::from_millis(100), idle)
            .await
            .expect("idle signal");
        assert!(tracker.is_idle());
    }

    #[tokio::test]
    async fn test_panicking_future_still_settles() {
        let tracker = PromiseTracker::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        async fn explode() -> anyhow::Result<()> {
            panic!("handler blew up")
        }

        tracker.track_with(Completion::pending(explode()), move |r| {
            let _ = tx.send(r.is_err());
        });

        assert!(rx.await.expect("settled"));
        tokio::task::yield_now().await;
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_ignores_stale_operations() {
        let tracker = PromiseTracker::new();
        let settled = Arc::new(Mutex::new(false));
        let slot = Arc::clone(&settled);

        tracker.track_with(
            Completion::pending(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            }),
            move |_| *slot.lock() = true,
        );
        assert_eq!(tracker.pending(), 1);

        tracker.reset();
        assert_eq!(tracker.pending(), 0);
        assert_eq!(tracker.generation(), 1);

        tracker.track(Completion::pending(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.pending(), 1);
        assert!(!*settled.lock());
    }
}
