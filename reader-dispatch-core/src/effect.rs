//! Effect classification and invocation
//!
//! A matched registration plus an incoming action becomes an [`Effect`]: a
//! fully resolved invocation record tagged with one of four shapes. Each
//! shape has its own invocation strategy, and every strategy performs the
//! same two-phase call: build a [`Context`], hand it to the handler to get a
//! [`Thunk`], then run the thunk to get a [`Completion`].
//!
//! # Shapes
//!
//! | payload present | dependency factory | kind |
//! |---|---|---|
//! | no | no | [`EffectKind::DispatchOnly`] |
//! | no | yes | [`EffectKind::DependencyOnly`] |
//! | yes | no | [`EffectKind::PayloadDispatch`] |
//! | yes | yes | [`EffectKind::PayloadDependency`] |
//!
//! # Example
//!
//! ```ignore
//! use reader_dispatch::{Context, Dependencies, Dispatcher, Thunk};
//!
//! // Synchronous handler
//! let set_name = |ctx: Context<(), Dispatcher<Action>>| {
//!     Thunk::new(move || ctx.dependencies.dispatch(Action::SetName("NewName".into())))
//! };
//!
//! // Asynchronous handler with a payload
//! let add_later = |ctx: Context<i64, Dispatcher<Action>>| {
//!     Thunk::future(async move {
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!         ctx.dependencies.dispatch(Action::SetCount(ctx.payload.unwrap_or_default()));
//!         Ok(())
//!     })
//! };
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

/// The four handler shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// No payload, bare dispatch dependency.
    DispatchOnly,
    /// No payload, injected dependency object.
    DependencyOnly,
    /// Payload, bare dispatch dependency.
    PayloadDispatch,
    /// Payload, injected dependency object.
    PayloadDependency,
}

impl EffectKind {
    /// Classify from payload presence and whether dependencies are injected.
    pub fn classify(has_payload: bool, injected: bool) -> Self {
        match (has_payload, injected) {
            (false, false) => EffectKind::DispatchOnly,
            (false, true) => EffectKind::DependencyOnly,
            (true, false) => EffectKind::PayloadDispatch,
            (true, true) => EffectKind::PayloadDependency,
        }
    }

    /// Whether this shape carries a payload.
    pub fn has_payload(self) -> bool {
        matches!(
            self,
            EffectKind::PayloadDispatch | EffectKind::PayloadDependency
        )
    }

    /// Whether this shape receives an injected dependency object.
    pub fn is_injected(self) -> bool {
        matches!(
            self,
            EffectKind::DependencyOnly | EffectKind::PayloadDependency
        )
    }

    /// Name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EffectKind::DispatchOnly => "dispatch_only",
            EffectKind::DependencyOnly => "dependency_only",
            EffectKind::PayloadDispatch => "payload_dispatch",
            EffectKind::PayloadDependency => "payload_dependency",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single argument passed to a handler.
#[derive(Debug, Clone)]
pub struct Context<P, D> {
    /// Payload of the triggering action, if it carried one.
    pub payload: Option<P>,
    /// Dispatch function or injected dependency object.
    pub dependencies: D,
    /// Shape this invocation was classified as.
    pub kind: EffectKind,
}

impl<P, D> Context<P, D> {
    /// Borrow the payload.
    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    /// Borrow the dependencies.
    pub fn deps(&self) -> &D {
        &self.dependencies
    }

    /// Split into payload and dependencies.
    pub fn into_parts(self) -> (Option<P>, D) {
        (self.payload, self.dependencies)
    }
}

/// Outcome of running a handler's thunk.
pub enum Completion {
    /// Finished synchronously.
    Done,
    /// Failed synchronously.
    Failed(anyhow::Error),
    /// Still running; settles when the future completes.
    Pending(BoxFuture<'static, anyhow::Result<()>>),
}

impl Completion {
    /// Wrap a future as a pending completion.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Completion::Pending(future.boxed())
    }

    /// Whether the completion is still outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, Completion::Pending(_))
    }
}

impl From<anyhow::Result<()>> for Completion {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Completion::Done,
            Err(e) => Completion::Failed(e),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Done => f.write_str("Done"),
            Completion::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            Completion::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A deferred handler action.
///
/// Nothing runs until [`Thunk::run`] is called; for [`Thunk::future`] the
/// future is not polled until the returned completion is tracked.
pub struct Thunk(Box<dyn FnOnce() -> Completion + Send>);

impl Thunk {
    /// A synchronous thunk.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(move || {
            f();
            Completion::Done
        }))
    }

    /// A synchronous thunk that may fail.
    pub fn try_new<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self(Box::new(move || f().into()))
    }

    /// An asynchronous thunk.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self(Box::new(move || Completion::pending(future)))
    }

    /// A thunk producing an arbitrary completion.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> Completion + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// A thunk that does nothing.
    pub fn noop() -> Self {
        Self(Box::new(|| Completion::Done))
    }

    /// Execute the deferred action.
    pub fn run(self) -> Completion {
        (self.0)()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

/// A handler: receives a [`Context`] and returns a deferred action.
pub type Handler<P, D> = Arc<dyn Fn(Context<P, D>) -> Thunk + Send + Sync>;

/// A fully resolved invocation record.
///
/// Each variant carries exactly what its strategy needs.
#[derive(Debug, Clone)]
pub enum Effect<P, D> {
    DispatchOnly { dependencies: D },
    DependencyOnly { dependencies: D },
    PayloadDispatch { payload: P, dependencies: D },
    PayloadDependency { payload: P, dependencies: D },
}

impl<P, D> Effect<P, D> {
    /// Classify an invocation.
    ///
    /// `injected` is whether the dependencies came from a dependency factory.
    pub fn classify(payload: Option<P>, dependencies: D, injected: bool) -> Self {
        match (payload, injected) {
            (None, false) => Effect::DispatchOnly { dependencies },
            (None, true) => Effect::DependencyOnly { dependencies },
            (Some(payload), false) => Effect::PayloadDispatch {
                payload,
                dependencies,
            },
            (Some(payload), true) => Effect::PayloadDependency {
                payload,
                dependencies,
            },
        }
    }

    /// The classification tag.
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::DispatchOnly { .. } => EffectKind::DispatchOnly,
            Effect::DependencyOnly { .. } => EffectKind::DependencyOnly,
            Effect::PayloadDispatch { .. } => EffectKind::PayloadDispatch,
            Effect::PayloadDependency { .. } => EffectKind::PayloadDependency,
        }
    }

    /// Invoke `handler` with the strategy for this effect's shape.
    pub fn run(self, handler: &Handler<P, D>) -> Completion {
        match self {
            Effect::DispatchOnly { dependencies } => dispatch_strategy(handler, dependencies),
            Effect::DependencyOnly { dependencies } => dependency_strategy(handler, dependencies),
            Effect::PayloadDispatch {
                payload,
                dependencies,
            } => payload_dispatch_strategy(handler, payload, dependencies),
            Effect::PayloadDependency {
                payload,
                dependencies,
            } => payload_dependency_strategy(handler, payload, dependencies),
        }
    }
}

fn invoke<P, D>(handler: &Handler<P, D>, context: Context<P, D>) -> Completion {
    handler(context).run()
}

fn dispatch_strategy<P, D>(handler: &Handler<P, D>, dispatch: D) -> Completion {
    invoke(
        handler,
        Context {
            payload: None,
            dependencies: dispatch,
            kind: EffectKind::DispatchOnly,
        },
    )
}

fn dependency_strategy<P, D>(handler: &Handler<P, D>, dependencies: D) -> Completion {
    invoke(
        handler,
        Context {
            payload: None,
            dependencies,
            kind: EffectKind::DependencyOnly,
        },
    )
}

fn payload_dispatch_strategy<P, D>(handler: &Handler<P, D>, payload: P, dispatch: D) -> Completion {
    invoke(
        handler,
        Context {
            payload: Some(payload),
            dependencies: dispatch,
            kind: EffectKind::PayloadDispatch,
        },
    )
}

fn payload_dependency_strategy<P, D>(
    handler: &Handler<P, D>,
    payload: P,
    dependencies: D,
) -> Completion {
    invoke(
        handler,
        Context {
            payload: Some(payload),
            dependencies,
            kind: EffectKind::PayloadDependency,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Seen = Arc<Mutex<Vec<(Option<i64>, &'static str, EffectKind)>>>;

    fn recording_handler(seen: Seen) -> Handler<i64, &'static str> {
        Arc::new(move |ctx: Context<i64, &'static str>| {
            let seen = Arc::clone(&seen);
            Thunk::new(move || seen.lock().push((ctx.payload, ctx.dependencies, ctx.kind)))
        })
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(EffectKind::classify(false, false), EffectKind::DispatchOnly);
        assert_eq!(EffectKind::classify(false, true), EffectKind::DependencyOnly);
        assert_eq!(EffectKind::classify(true, false), EffectKind::PayloadDispatch);
        assert_eq!(
            EffectKind::classify(true, true),
            EffectKind::PayloadDependency
        );
    }

    #[test]
    fn test_effect_classify_matches_kind_table() {
        for payload in [None, Some(5)] {
            for injected in [false, true] {
                let effect = Effect::classify(payload, "deps", injected);
                assert_eq!(
                    effect.kind(),
                    EffectKind::classify(payload.is_some(), injected)
                );
                assert_eq!(effect.kind().has_payload(), payload.is_some());
                assert_eq!(effect.kind().is_injected(), injected);
            }
        }
    }

    #[test]
    fn test_falsy_payload_is_still_payload() {
        let effect = Effect::classify(Some(0), "deps", false);
        assert_eq!(effect.kind(), EffectKind::PayloadDispatch);

        let effect = Effect::classify(Some(false), (), true);
        assert_eq!(effect.kind(), EffectKind::PayloadDependency);
    }

    #[test]
    fn test_strategies_shape_context() {
        let seen: Seen = Arc::default();
        let handler = recording_handler(Arc::clone(&seen));

        Effect::classify(None, "dispatch", false).run(&handler);
        Effect::classify(None, "deps", true).run(&handler);
        Effect::classify(Some(5), "dispatch", false).run(&handler);
        Effect::classify(Some(0), "deps", true).run(&handler);

        assert_eq!(
            *seen.lock(),
            vec![
                (None, "dispatch", EffectKind::DispatchOnly),
                (None, "deps", EffectKind::DependencyOnly),
                (Some(5), "dispatch", EffectKind::PayloadDispatch),
                (Some(0), "deps", EffectKind::PayloadDependency),
            ]
        );
    }

    #[test]
    fn test_thunk_is_deferred() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let thunk = Thunk::new(move || *flag.lock() = true);

        assert!(!*ran.lock());
        assert!(matches!(thunk.run(), Completion::Done));
        assert!(*ran.lock());
    }

    #[test]
    fn test_try_new_failure() {
        let completion = Thunk::try_new(|| Err(anyhow::anyhow!("boom"))).run();
        assert!(matches!(completion, Completion::Failed(ref e) if e.to_string() == "boom"));
    }

    #[tokio::test]
    async fn test_future_thunk_is_pending() {
        let completion = Thunk::future(async { Ok(()) }).run();
        assert!(completion.is_pending());

        if let Completion::Pending(fut) = completion {
            assert!(fut.await.is_ok());
        }
    }
}
