//! Core traits and types for reader-dispatch
//!
//! This crate provides reducer middleware for applications that keep state in
//! a reducer-driven store: side-effecting handlers registered per action type,
//! with dependencies injected reader-style, run before the reducer sees the
//! action.
//!
//! # Core Concepts
//!
//! - **Action**: Discriminated events with a type key and an optional payload
//! - **Dispatcher**: A clonable dispatch function
//! - **Handler**: `Fn(Context) -> Thunk`, resolved and invoked per matching action
//! - **Session**: Registered handlers, pending-work tracking and observations
//! - **Observer**: Waits for async handlers to settle, with a bounded retry budget
//!
//! # Basic Example
//!
//! ```ignore
//! use reader_dispatch_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum CountAction {
//!     SetCount(i64),
//!     Add(i64),
//! }
//!
//! fn reducer(state: &mut i64, action: CountAction) -> bool {
//!     match action {
//!         CountAction::SetCount(n) => { *state = n; true }
//!         _ => false,
//!     }
//! }
//!
//! let store = ReaderStore::new(0, reducer);
//! store.register("ADD", |ctx: Context<i64, Dispatcher<CountAction>>| {
//!     Thunk::new(move || {
//!         let n = ctx.payload.unwrap_or_default();
//!         ctx.dependencies.dispatch(CountAction::SetCount(n))
//!     })
//! })?;
//!
//! store.dispatch(CountAction::Add(5));
//! assert_eq!(store.state(), 5);
//! ```
//!
//! # Async Handler Pattern
//!
//! Handlers return a [`Thunk`]. A thunk built with [`Thunk::future`] is
//! spawned on the current tokio runtime and tracked until it settles, so
//! callers can wait for it:
//!
//! ```ignore
//! store.register("FETCH", |ctx: Context<(), Dispatcher<Action>>| {
//!     Thunk::future(async move {
//!         let body = fetch_from_api().await?;
//!         ctx.dependencies.dispatch(Action::DidFetch(body));
//!         Ok(())
//!     })
//! })?;
//!
//! store.dispatch(Action::Fetch);
//! let observed = store.observe().await?;
//! assert_eq!(observed.get("FETCH").len(), 1);
//! ```
//!
//! The `Did*` naming convention keeps result actions apart from the intent
//! actions that trigger handlers.

pub mod action;
pub mod dispatcher;
pub mod effect;
pub mod error;
pub mod middleware;
pub mod observer;
pub mod registry;
pub mod session;
pub mod store;
pub mod testing;
pub mod tracker;

// Core trait exports
pub use action::{Action, ActionType};
pub use dispatcher::{Dependencies, DependencyFactory, Dispatcher};

// Effect exports
pub use effect::{Completion, Context, Effect, EffectKind, Handler, Thunk};

// Registration and composition exports
pub use middleware::{ComposedDispatch, LoggingMiddleware, Middleware, Scope};
pub use registry::{DependencySource, PreEffect, Registration, Registry};
pub use session::{
    HandlerFailure, HandlerMap, Observation, ObservedActions, Session, SessionConfig,
};

// Observation exports
pub use observer::{Observer, ObserverConfig};
pub use tracker::PromiseTracker;

// Store exports
pub use store::{ReaderStore, Reducer, Store};

// Error exports
pub use error::{DispatchError, ObserveError, RegistryError};

// Testing exports
pub use testing::TestHarness;

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionType};
    pub use crate::dispatcher::{Dependencies, Dispatcher};
    pub use crate::effect::{Context, EffectKind, Thunk};
    pub use crate::error::{ObserveError, RegistryError};
    pub use crate::middleware::{LoggingMiddleware, Middleware};
    pub use crate::observer::{Observer, ObserverConfig};
    pub use crate::registry::Registration;
    pub use crate::session::{HandlerMap, Observation, Session, SessionConfig};
    pub use crate::store::{ReaderStore, Reducer, Store};
}
