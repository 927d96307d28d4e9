//! Reducer-backed state store and the handler-aware store built on it

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::action::{Action, ActionType};
use crate::dispatcher::{Dependencies, Dispatcher};
use crate::effect::{Context, Thunk};
use crate::error::{ObserveError, RegistryError};
use crate::middleware::ComposedDispatch;
use crate::observer::Observer;
use crate::registry::Registration;
use crate::session::{HandlerMap, Observation, Session};

/// A reducer function that handles actions and mutates state
///
/// Returns `true` if the state changed.
pub type Reducer<S, A> = fn(&mut S, A) -> bool;

/// Centralized state container with a reducer
///
/// The store is the host side of the middleware: its [`dispatcher`](Store::dispatcher)
/// is the base dispatch that every composed dispatch ends in. State lives
/// behind a shared lock so handlers can dispatch from spawned tasks.
///
/// # Example
/// ```ignore
/// #[derive(Default, Clone)]
/// struct CountState {
///     count: i64,
/// }
///
/// fn reducer(state: &mut CountState, action: CountAction) -> bool {
///     match action {
///         CountAction::SetCount(n) => {
///             state.count = n;
///             true
///         }
///         _ => false,
///     }
/// }
///
/// let store = Store::new(CountState::default(), reducer);
/// store.dispatcher().dispatch(CountAction::SetCount(1));
/// assert_eq!(store.state().count, 1);
/// ```
pub struct Store<S, A: Action> {
    state: Arc<Mutex<S>>,
    reducer: Reducer<S, A>,
    dispatches: Arc<AtomicUsize>,
}

impl<S, A: Action> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer,
            dispatches: Arc::clone(&self.dispatches),
        }
    }
}

impl<S, A: Action> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("dispatches", &self.dispatch_count())
            .finish_non_exhaustive()
    }
}

impl<S, A: Action> Store<S, A> {
    /// Number of actions that reached the reducer
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }
}

impl<S: Send + 'static, A: Action> Store<S, A> {
    /// Create a new store with initial state and reducer
    pub fn new(state: S, reducer: Reducer<S, A>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            reducer,
            dispatches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run the reducer on an action
    ///
    /// Returns `true` if the state changed.
    pub fn dispatch(&self, action: A) -> bool {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        let changed = (self.reducer)(&mut self.state.lock(), action);
        tracing::trace!(changed, "reducer ran");
        changed
    }

    /// The base dispatch for this store
    pub fn dispatcher(&self) -> Dispatcher<A> {
        let store = self.clone();
        Dispatcher::new(move |action| {
            store.dispatch(action);
        })
    }

    /// Run `f` with a reference to the current state
    ///
    /// The state lock is held while `f` runs. Dispatching into this store
    /// from `f` deadlocks.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.lock())
    }

    /// Mutate the state directly
    ///
    /// Use this sparingly - prefer dispatching actions for state changes.
    /// The state lock is held while `f` runs, so `f` must not dispatch
    /// into this store.
    pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.state.lock())
    }
}

impl<S: Clone + Send + 'static, A: Action> Store<S, A> {
    /// A copy of the current state
    pub fn state(&self) -> S {
        self.state.lock().clone()
    }
}

/// Store whose dispatch runs registered handlers before the reducer
///
/// Wraps a [`Store`] and a [`Session`]: actions go through every handler
/// layer of the session, then reach the reducer exactly once.
///
/// # Example
/// ```ignore
/// let store = ReaderStore::new(CountState::default(), reducer);
///
/// store.register_with(
///     "ADD",
///     |ctx: Context<i64, AddDeps>| {
///         Thunk::new(move || {
///             let n = ctx.payload.unwrap_or_default() + ctx.dependencies.bonus;
///             ctx.dependencies.dispatch(CountAction::SetCount(n));
///         })
///     },
///     |dispatch| AddDeps { dispatch, bonus: 2 },
/// )?;
///
/// store.dispatch(CountAction::Add(5));
/// assert_eq!(store.state().count, 7);
/// ```
pub struct ReaderStore<S, A: Action> {
    store: Store<S, A>,
    session: Session<A>,
    dispatch: ComposedDispatch<A>,
}

impl<S, A: Action> Clone for ReaderStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            session: self.session.clone(),
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<S, A: Action> fmt::Debug for ReaderStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderStore")
            .field("store", &self.store)
            .field("session", &self.session)
            .finish()
    }
}

impl<S: Send + 'static, A: Action> ReaderStore<S, A> {
    /// Create a store with its own session
    pub fn new(state: S, reducer: Reducer<S, A>) -> Self {
        Self::with_session(state, reducer, Session::new())
    }

    /// Create a store sharing an existing session
    pub fn with_session(state: S, reducer: Reducer<S, A>, session: Session<A>) -> Self {
        let store = Store::new(state, reducer);
        let dispatch = session.compose(store.dispatcher());
        Self {
            store,
            session,
            dispatch,
        }
    }

    /// Register a handler that receives the dispatch function
    pub fn register<F>(
        &self,
        action_type: impl Into<ActionType>,
        handler: F,
    ) -> Result<Registration, RegistryError>
    where
        F: Fn(Context<A::Payload, Dispatcher<A>>) -> Thunk + Send + Sync + 'static,
    {
        self.session.register(action_type, handler)
    }

    /// Register a handler with a dependency factory
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
        self.session.register_with(action_type, handler, factory)
    }

    /// Register a map of handlers
    pub fn register_map(
        &self,
        map: HandlerMap<A, Dispatcher<A>>,
    ) -> Result<Vec<Registration>, RegistryError> {
        self.session.register_map(map)
    }

    /// Register a map of handlers sharing one dependency factory
    pub fn register_map_with<D, G>(
        &self,
        map: HandlerMap<A, D>,
        factory: G,
    ) -> Result<Vec<Registration>, RegistryError>
    where
        D: Dependencies<A>,
        G: Fn(Dispatcher<A>) -> D + Send + Sync + 'static,
    {
        self.session.register_map_with(map, factory)
    }

    /// Dispatch an action through the handlers and the reducer
    pub fn dispatch(&self, action: A) {
        self.dispatch.dispatch(action)
    }

    /// The composed dispatch as a plain dispatcher
    pub fn dispatcher(&self) -> Dispatcher<A> {
        self.dispatch.dispatcher()
    }

    /// The underlying store
    pub fn store(&self) -> &Store<S, A> {
        &self.store
    }

    /// The session holding the handlers
    pub fn session(&self) -> &Session<A> {
        &self.session
    }

    /// Run `f` with a reference to the current state
    ///
    /// Holds the state lock like [`Store::with_state`]: do not dispatch from `f`.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.store.with_state(f)
    }

    /// An observer for this store's session
    pub fn observer(&self) -> Observer<A> {
        self.session.observer()
    }

    /// Wait for pending handlers, then snapshot what they dispatched
    pub async fn observe(&self) -> Result<Observation<A>, ObserveError> {
        self.session.observe().await
    }

    /// Reset the session (handlers, observations, pending count)
    ///
    /// State is left alone.
    pub fn reset(&self) {
        self.session.reset()
    }
}

impl<S: Clone + Send + 'static, A: Action> ReaderStore<S, A> {
    /// A copy of the current state
    pub fn state(&self) -> S {
        self.store.state()
    }
}
