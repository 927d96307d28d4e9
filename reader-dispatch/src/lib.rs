//! reader-dispatch: handler middleware for reducer-based state stores
//!
//! Register side-effecting handlers per action type. Each handler receives
//! the action's payload and its dependencies (the dispatch function, or
//! whatever a dependency factory builds around it) and runs before the
//! reducer sees the action. Async handlers are tracked so tests can wait for
//! them to settle.
//!
//! # Example
//! ```ignore
//! use reader_dispatch::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(payload = "i64", rename_all = "SCREAMING_SNAKE_CASE")]
//! enum CountAction {
//!     SetCount(i64),
//!     Add(i64),
//! }
//!
//! #[derive(Clone)]
//! struct AddDeps {
//!     dispatch: Dispatcher<CountAction>,
//!     bonus: i64,
//! }
//!
//! impl Dependencies<CountAction> for AddDeps {
//!     fn dispatcher(&self) -> &Dispatcher<CountAction> {
//!         &self.dispatch
//!     }
//! }
//!
//! let store = ReaderStore::new(0, reducer);
//! store.register_with(
//!     "ADD",
//!     |ctx: Context<i64, AddDeps>| {
//!         Thunk::new(move || {
//!             let n = ctx.payload.unwrap_or_default() + ctx.dependencies.bonus;
//!             ctx.dependencies.dispatch(CountAction::SetCount(n))
//!         })
//!     },
//!     |dispatch| AddDeps { dispatch, bonus: 2 },
//! )?;
//! ```

// Re-export everything from core
pub use reader_dispatch_core::*;

// Re-export derive macros
pub use reader_dispatch_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use reader_dispatch_core::{Action, Dependencies, Middleware};

    // Handlers
    pub use reader_dispatch_core::{ActionType, Context, Dispatcher, EffectKind, Thunk};

    // Sessions and observation
    pub use reader_dispatch_core::{
        HandlerMap, LoggingMiddleware, Observation, ObserveError, Observer, ObserverConfig,
        Registration, RegistryError, Session, SessionConfig,
    };

    // Store
    pub use reader_dispatch_core::{ReaderStore, Reducer, Store};

    // Derive macros
    pub use reader_dispatch_macros::Action;
}
