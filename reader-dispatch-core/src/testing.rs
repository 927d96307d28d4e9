//! Test utilities for reader-dispatch applications
//!
//! - [`TestHarness`]: a [`ReaderStore`] with a fresh session, plus helpers to
//!   settle async handlers and inspect what they dispatched
//! - Assertion macros for verifying observed actions
//!
//! # Example
//!
//! ```ignore
//! use reader_dispatch::testing::TestHarness;
//! use reader_dispatch::assert_observed;
//!
//! let harness = TestHarness::new(AppState::default(), reducer);
//! harness.register("FETCH", fetch_handler)?;
//!
//! harness.dispatch(Action::Fetch);
//! let observed = harness.settle().await?;
//! assert_observed!(observed.get("FETCH"), Action::DidFetch(_));
//! ```

use std::ops::Deref;

use crate::action::Action;
use crate::error::ObserveError;
use crate::observer::ObserverConfig;
use crate::session::{Observation, Session, SessionConfig};
use crate::store::{ReaderStore, Reducer};

/// Test harness around a [`ReaderStore`].
///
/// Every harness owns its own session, so handlers registered in one test
/// never reach another. Derefs to the store for registration and dispatch.
pub struct TestHarness<S, A: Action> {
    store: ReaderStore<S, A>,
}

impl<S: Send + 'static, A: Action> TestHarness<S, A> {
    /// Create a harness with the default observer policy.
    pub fn new(state: S, reducer: Reducer<S, A>) -> Self {
        Self::with_observer(state, reducer, ObserverConfig::default())
    }

    /// Create a harness with a custom observer policy.
    pub fn with_observer(state: S, reducer: Reducer<S, A>, observer: ObserverConfig) -> Self {
        let session = Session::with_config(SessionConfig::default().with_observer(observer));
        Self {
            store: ReaderStore::with_session(state, reducer, session),
        }
    }

    /// Dispatch each action in order.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = A>) {
        for action in actions {
            self.store.dispatch(action);
        }
    }

    /// Wait for pending handlers and return what they dispatched.
    pub async fn settle(&self) -> Result<Observation<A>, ObserveError> {
        self.store.observe().await
    }

    /// Handler-dispatched actions recorded under `action_type` so far.
    pub fn observed(&self, action_type: &str) -> Vec<A> {
        self.store.session().snapshot().get(action_type).to_vec()
    }

    /// Whether any handler failed so far.
    pub fn has_failures(&self) -> bool {
        !self.store.session().snapshot().is_clean()
    }
}

impl<S, A: Action> Deref for TestHarness<S, A> {
    type Target = ReaderStore<S, A>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl<S: Default + Send + 'static, A: Action> TestHarness<S, A> {
    /// Create a harness starting from `S::default()`.
    pub fn with_reducer(reducer: Reducer<S, A>) -> Self {
        Self::new(S::default(), reducer)
    }
}

/// Pause tokio's clock for the current runtime.
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Resume tokio's clock for the current runtime.
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Advance the paused clock, letting sleeping handlers wake.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: std::time::Duration) {
    tokio::time::advance(duration).await;
}

/// Assert that an action matching a pattern was observed.
///
/// # Example
///
/// ```ignore
/// use reader_dispatch::assert_observed;
///
/// let observed = harness.settle().await?;
/// assert_observed!(observed.get("ADD"), Action::SetCount(7));
/// assert_observed!(observed.get("ADD"), Action::SetCount(n) if *n > 0);
/// ```
#[macro_export]
macro_rules! assert_observed {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be observed, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no action matching a pattern was observed.
///
/// # Example
///
/// ```ignore
/// use reader_dispatch::assert_not_observed;
///
/// assert_not_observed!(observed.get("ADD"), Action::Reset);
/// ```
#[macro_export]
macro_rules! assert_not_observed {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be observed, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Count how many observed actions match a pattern.
///
/// # Example
///
/// ```ignore
/// use reader_dispatch::count_observed;
///
/// assert_eq!(count_observed!(observed.get("TICK"), Action::SetCount(_)), 3);
/// ```
#[macro_export]
macro_rules! count_observed {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::dispatcher::Dispatcher;
    use crate::effect::{Context, Thunk};

    #[derive(Default, Clone, Debug, PartialEq)]
    struct Counter {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Tick,
        Bump(i32),
        Fail,
    }

    impl Action for TestAction {
        type Payload = i32;

        fn name(&self) -> &str {
            match self {
                TestAction::Tick => "TICK",
                TestAction::Bump(_) => "BUMP",
                TestAction::Fail => "FAIL",
            }
        }

        fn payload(&self) -> Option<i32> {
            match self {
                TestAction::Bump(n) => Some(*n),
                _ => None,
            }
        }
    }

    fn reducer(state: &mut Counter, action: TestAction) -> bool {
        match action {
            TestAction::Bump(n) => {
                state.count += n;
                true
            }
            _ => false,
        }
    }

    fn tick(ctx: Context<i32, Dispatcher<TestAction>>) -> Thunk {
        Thunk::future(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.dependencies.dispatch(TestAction::Bump(1));
            Ok(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_harness_settles_async_handlers() {
        let harness = TestHarness::<Counter, TestAction>::with_reducer(reducer);
        harness.register("TICK", tick).unwrap();

        harness.dispatch_all([TestAction::Tick, TestAction::Tick, TestAction::Tick]);
        assert_eq!(harness.state().count, 0);

        let observed = harness.settle().await.unwrap();
        assert_eq!(harness.state().count, 3);
        assert_eq!(count_observed!(observed.get("TICK"), TestAction::Bump(1)), 3);
        assert_eq!(harness.observed("TICK").len(), 3);
    }

    #[test]
    fn test_harness_failures() {
        let harness = TestHarness::<Counter, TestAction>::with_reducer(reducer);
        harness
            .register("FAIL", |_: Context<i32, Dispatcher<TestAction>>| {
                Thunk::try_new(|| anyhow::bail!("nope"))
            })
            .unwrap();

        assert!(!harness.has_failures());
        harness.dispatch(TestAction::Fail);
        assert!(harness.has_failures());
    }

    #[test]
    fn test_harnesses_are_isolated() {
        let a = TestHarness::<Counter, TestAction>::with_reducer(reducer);
        let b = TestHarness::<Counter, TestAction>::with_reducer(reducer);

        a.register("TICK", tick).unwrap();
        assert!(a.session().is_registered("TICK"));
        assert!(!b.session().is_registered("TICK"));
    }

    #[test]
    fn test_observe_macros() {
        let actions = vec![TestAction::Tick, TestAction::Bump(42)];

        assert_observed!(actions, TestAction::Tick);
        assert_observed!(actions, TestAction::Bump(n) if *n > 40);
        assert_not_observed!(actions, TestAction::Bump(99));
        assert_not_observed!(actions, TestAction::Fail);
        assert_eq!(count_observed!(actions, TestAction::Bump(_)), 1);
    }
}
