//! Session-scoped handler state
//!
//! A [`Session`] owns everything handlers share: the registry, the promise
//! tracker, the observed-actions map, recorded failures and subscribers.
//! Every [`ComposedDispatch`] built from the same session sees the same
//! registrations. Call [`Session::reset`] between independent runs (test
//! cases, for instance) so handlers do not leak from one into the next.
//!
//! # Example
//!
//! ```ignore
//! use reader_dispatch::{Context, Dispatcher, Session, Thunk};
//!
//! let session = Session::<CountAction>::new();
//! session.register("RUN_NAME_HANDLER", |ctx: Context<i64, Dispatcher<CountAction>>| {
//!     Thunk::new(move || ctx.dependencies.dispatch(CountAction::SetName("NewName".into())))
//! })?;
//!
//! let dispatch = session.compose(store.dispatcher());
//! dispatch.dispatch(CountAction::RunNameHandler);
//!
//! let observed = session.observe().await?;
//! assert_eq!(observed.get("RUN_NAME_HANDLER").len(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::action::{Action, ActionType};
use crate::dispatcher::{Dependencies, Dispatcher};
use crate::effect::{Completion, Context, EffectKind, Handler, Thunk};
use crate::error::{ObserveError, RegistryError};
use crate::middleware::{ComposedDispatch, Middleware};
use crate::observer::{Observer, ObserverConfig};
use crate::registry::{DependencySource, PreEffect, Registration, Registry};
use crate::tracker::PromiseTracker;

/// Session configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiescence polling used by [`Session::observe`].
    pub observer: ObserverConfig,
}

impl SessionConfig {
    /// Override the observer configuration.
    pub fn with_observer(mut self, observer: ObserverConfig) -> Self {
        self.observer = observer;
        self
    }
}

/// Actions dispatched by handlers, grouped by the action type that triggered them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ObservedActions<A> {
    by_type: BTreeMap<ActionType, Vec<A>>,
}

impl<A> Default for ObservedActions<A> {
    fn default() -> Self {
        Self {
            by_type: BTreeMap::new(),
        }
    }
}

impl<A> ObservedActions<A> {
    /// Actions recorded under `action_type`, oldest first.
    pub fn get(&self, action_type: &str) -> &[A] {
        self.by_type
            .get(action_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether anything was recorded under `action_type`.
    pub fn contains(&self, action_type: &str) -> bool {
        self.by_type.contains_key(action_type)
    }

    /// Types with at least one recorded action.
    pub fn types(&self) -> impl Iterator<Item = &ActionType> {
        self.by_type.keys()
    }

    /// Iterate over `(type, actions)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ActionType, &[A])> {
        self.by_type.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Total number of recorded actions.
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    fn record(&mut self, matched: ActionType, action: A) {
        self.by_type.entry(matched).or_default().push(action);
    }

    fn clear(&mut self) {
        self.by_type.clear();
    }
}

/// A handler that failed, asynchronously or synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    /// Type whose handler failed.
    pub action_type: ActionType,
    /// Shape the invocation was classified as.
    pub kind: EffectKind,
    /// Rendered error chain.
    pub message: String,
}

/// Snapshot returned by the observer once no handler work is pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation<A> {
    /// Actions dispatched by handlers, per triggering type.
    pub actions: ObservedActions<A>,
    /// Handler failures recorded so far.
    pub failures: Vec<HandlerFailure>,
}

impl<A> Observation<A> {
    /// Actions recorded under `action_type`.
    pub fn get(&self, action_type: &str) -> &[A] {
        self.actions.get(action_type)
    }

    /// Whether no handler failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

type Subscriber<A> = Arc<dyn Fn(&ActionType, &A) + Send + Sync>;

struct Shared<A: Action> {
    config: SessionConfig,
    registry: RwLock<Registry<A>>,
    tracker: PromiseTracker,
    observed: Mutex<ObservedActions<A>>,
    failures: Mutex<Vec<HandlerFailure>>,
    subscribers: RwLock<Vec<Subscriber<A>>>,
}

/// Shared handler state for one session. Cheap to clone.
pub struct Session<A: Action> {
    shared: Arc<Shared<A>>,
}

impl<A: Action> Clone for Session<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: Action> Default for Session<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("registered", &self.shared.registry.read().len())
            .field("pending", &self.shared.tracker.pending())
            .finish()
    }
}

impl<A: Action> Session<A> {
    /// Create a session with default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session with the given configuration.
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry: RwLock::new(Registry::new()),
                tracker: PromiseTracker::new(),
                observed: Mutex::new(ObservedActions::default()),
                failures: Mutex::new(Vec::new()),
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Register a handler that receives the dispatch function.
    ///
    /// Re-registering a type is a no-op.
    pub fn register<F>(
        &self,
        action_type: impl Into<ActionType>,
        handler: F,
    ) -> Result<Registration, RegistryError>
    where
        F: Fn(Context<A::Payload, Dispatcher<A>>) -> Thunk + Send + Sync + 'static,
    {
        self.shared.registry.write().register(action_type, handler)
    }

    /// Register a handler whose dependencies come from `factory`.
    ///
    /// Re-registering a type is a no-op.
    pub fn register_with<F, G, D>(
        &self,
        action_type: impl Into<ActionType>,
        handler: F,
        factory: G,
    ) -> Result<Registration, RegistryError>
    where
        D: Dependencies<A>,
        F: Fn(Context<A::Payload, D>) -> Thunk + Send + Sync + 'static,
        G: Fn(Dispatcher<A>) -> D + Send + Sync + 'static,
    {
        self.shared
            .registry
            .write()
            .register_with(action_type, handler, factory)
    }

    /// Register every entry of `map` with the dispatch function as dependencies.
    pub fn register_map(
        &self,
        map: HandlerMap<A, Dispatcher<A>>,
    ) -> Result<Vec<Registration>, RegistryError> {
        self.insert_all(map, DependencySource::dispatch())
    }

    /// Register every entry of `map` with one shared dependency factory.
    pub fn register_map_with<D, G>(
        &self,
        map: HandlerMap<A, D>,
        factory: G,
    ) -> Result<Vec<Registration>, RegistryError>
    where
        D: Dependencies<A>,
        G: Fn(Dispatcher<A>) -> D + Send + Sync + 'static,
    {
        self.insert_all(map, DependencySource::Factory(Arc::new(factory)))
    }

    fn insert_all<D: Dependencies<A>>(
        &self,
        map: HandlerMap<A, D>,
        dependencies: DependencySource<A, D>,
    ) -> Result<Vec<Registration>, RegistryError> {
        let mut registry = self.shared.registry.write();
        map.entries
            .into_iter()
            .map(|(action_type, handler)| {
                registry.insert(PreEffect::new(action_type, handler, dependencies.clone()))
            })
            .collect()
    }

    /// Append a non-handler layer (logging, say) to the chain.
    pub fn add_middleware<M: Middleware<A>>(&self, middleware: M) {
        self.shared.registry.write().push_layer(Arc::new(middleware));
    }

    /// Whether a handler is registered for `action_type`.
    pub fn is_registered(&self, action_type: &str) -> bool {
        self.shared.registry.read().contains(action_type)
    }

    /// Registered action types in registration order.
    pub fn registered_types(&self) -> Vec<ActionType> {
        self.shared
            .registry
            .read()
            .types()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Call `subscriber` with every action a handler dispatches.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&ActionType, &A) + Send + Sync + 'static,
    {
        self.shared.subscribers.write().push(Arc::new(subscriber));
    }

    /// Fold the registered handlers over `base`.
    pub fn compose(&self, base: Dispatcher<A>) -> ComposedDispatch<A> {
        ComposedDispatch::new(self.clone(), base)
    }

    /// The session's promise tracker.
    pub fn tracker(&self) -> &PromiseTracker {
        &self.shared.tracker
    }

    /// Number of handler operations still running.
    pub fn pending(&self) -> usize {
        self.shared.tracker.pending()
    }

    /// An observer using the session's configuration.
    pub fn observer(&self) -> Observer<A> {
        Observer::new(self.clone(), self.shared.config.observer)
    }

    /// Wait until no handler work is pending, then snapshot what was observed.
    pub async fn observe(&self) -> Result<Observation<A>, ObserveError> {
        self.observer().observe().await
    }

    /// Snapshot what was observed so far without waiting.
    pub fn snapshot(&self) -> Observation<A> {
        Observation {
            actions: self.shared.observed.lock().clone(),
            failures: self.shared.failures.lock().clone(),
        }
    }

    /// Clear registrations, observations, failures, subscribers and the
    /// pending counter.
    pub fn reset(&self) {
        tracing::debug!("resetting session");
        self.shared.registry.write().clear();
        self.shared.subscribers.write().clear();
        self.shared.tracker.reset();
        self.shared.observed.lock().clear();
        self.shared.failures.lock().clear();
    }

    pub(crate) fn layers(&self) -> Vec<Arc<dyn Middleware<A>>> {
        self.shared.registry.read().layers()
    }

    pub(crate) fn observable_dispatch(
        &self,
        matched: &ActionType,
        base: Dispatcher<A>,
    ) -> Dispatcher<A> {
        let session = self.clone();
        let matched = matched.clone();
        let generation = self.shared.tracker.generation();

        Dispatcher::new(move |action: A| {
            if session.shared.tracker.generation() == generation {
                tracing::debug!(
                    matched = %matched,
                    action = %action.name(),
                    "handler dispatched action"
                );
                session
                    .shared
                    .observed
                    .lock()
                    .record(matched.clone(), action.clone());

                let subscribers = session.shared.subscribers.read().clone();
                for subscriber in &subscribers {
                    subscriber(&matched, &action);
                }
            }
            base.dispatch(action);
        })
    }

    pub(crate) fn track(&self, matched: &ActionType, kind: EffectKind, completion: Completion) {
        let shared = Arc::clone(&self.shared);
        let matched = matched.clone();

        self.shared.tracker.track_with(completion, move |result| {
            if let Err(error) = result {
                tracing::warn!(
                    action = %matched,
                    kind = %kind,
                    error = %format!("{error:#}"),
                    "handler failed"
                );
                shared.failures.lock().push(HandlerFailure {
                    action_type: matched,
                    kind,
                    message: format!("{error:#}"),
                });
            }
        });
    }
}

/// A set of `type -> handler` entries registered together.
///
/// # Example
///
/// ```ignore
/// let map = HandlerMap::new()
///     .on("RUN_NAME_HANDLER", name_handler)
///     .on("RUN_COUNT_HANDLER", count_handler);
/// session.register_map_with(map, |dispatch| Deps { dispatch, to_add: 2 })?;
/// ```
pub struct HandlerMap<A: Action, D> {
    entries: Vec<(ActionType, Handler<A::Payload, D>)>,
}

impl<A: Action, D> Default for HandlerMap<A, D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: Action, D> fmt::Debug for HandlerMap<A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(t, _)| t))
            .finish()
    }
}

impl<A: Action, D: Dependencies<A>> HandlerMap<A, D> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn on<F>(mut self, action_type: impl Into<ActionType>, handler: F) -> Self
    where
        F: Fn(Context<A::Payload, D>) -> Thunk + Send + Sync + 'static,
    {
        self.entries.push((action_type.into(), Arc::new(handler)));
        self
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
