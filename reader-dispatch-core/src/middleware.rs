//! Middleware composition over a base dispatch
//!
//! Every registration is a middleware layer. A [`ComposedDispatch`] folds the
//! session's layers over the base dispatch right-to-left, so the
//! first-registered layer runs first and the base dispatch always runs last.
//! Layers cannot stop the chain: after each layer returns, the composer
//! continues with the next one, so every action reaches the base dispatch
//! exactly once whether it matched zero, one or many handlers. The one
//! exception is a synchronous handler that panics: the panic unwinds to the
//! caller of `dispatch` and the base is not reached for that action.

use std::fmt;
use std::sync::Arc;

use crate::action::{Action, ActionType};
use crate::dispatcher::Dispatcher;
use crate::effect::{Completion, EffectKind};
use crate::session::Session;

/// A layer in the composed dispatch chain.
pub trait Middleware<A: Action>: Send + Sync + 'static {
    /// Called with each dispatched action before it continues down the chain.
    fn handle(&self, scope: &Scope<'_, A>, action: &A);

    /// The action type this layer handles, if it is a handler registration.
    fn action_type(&self) -> Option<&ActionType> {
        None
    }
}

/// What a layer can reach while handling one action.
pub struct Scope<'a, A: Action> {
    base: &'a Dispatcher<A>,
    session: &'a Session<A>,
}

impl<'a, A: Action> Scope<'a, A> {
    pub(crate) fn new(base: &'a Dispatcher<A>, session: &'a Session<A>) -> Self {
        Self { base, session }
    }

    /// The base dispatch underneath the chain.
    pub fn base(&self) -> &Dispatcher<A> {
        self.base
    }

    /// The session this chain belongs to.
    pub fn session(&self) -> &Session<A> {
        self.session
    }

    /// A dispatch for handlers of `matched`.
    ///
    /// Actions sent through it are recorded for the observer under `matched`,
    /// passed to subscribers, then sent to the base dispatch.
    pub fn observable(&self, matched: &ActionType) -> Dispatcher<A> {
        self.session.observable_dispatch(matched, self.base.clone())
    }

    /// Hand a handler's completion to the session's promise tracker.
    pub fn track(&self, matched: &ActionType, kind: EffectKind, completion: Completion) {
        self.session.track(matched, kind, completion)
    }
}

/// The single dispatch function produced by folding all layers over a base.
///
/// Layers are read from the session on every dispatch, so handlers
/// registered after composition still take part.
pub struct ComposedDispatch<A: Action> {
    session: Session<A>,
    base: Dispatcher<A>,
}

impl<A: Action> Clone for ComposedDispatch<A> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            base: self.base.clone(),
        }
    }
}

impl<A: Action> fmt::Debug for ComposedDispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedDispatch")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<A: Action> ComposedDispatch<A> {
    /// Compose `session`'s layers over `base`.
    pub fn new(session: Session<A>, base: Dispatcher<A>) -> Self {
        Self { session, base }
    }

    /// Route an action through every layer, then the base dispatch.
    pub fn dispatch(&self, action: A) {
        let layers = self.session.layers();
        tracing::debug!(
            action = %action.name(),
            layers = layers.len(),
            "dispatching action"
        );

        let scope = Scope::new(&self.base, &self.session);
        run_chain(&layers, &scope, action);
    }

    /// The base dispatch underneath the chain.
    pub fn base(&self) -> &Dispatcher<A> {
        &self.base
    }

    /// The session supplying the layers.
    pub fn session(&self) -> &Session<A> {
        &self.session
    }

    /// A plain dispatcher with the same behavior as [`dispatch`](Self::dispatch).
    pub fn dispatcher(&self) -> Dispatcher<A> {
        let composed = self.clone();
        Dispatcher::new(move |action| composed.dispatch(action))
    }
}

impl<A: Action> From<ComposedDispatch<A>> for Dispatcher<A> {
    fn from(composed: ComposedDispatch<A>) -> Self {
        Dispatcher::new(move |action| composed.dispatch(action))
    }
}

// Outermost first; each layer continues to `next` unconditionally.
fn run_chain<A: Action>(layers: &[Arc<dyn Middleware<A>>], scope: &Scope<'_, A>, action: A) {
    match layers.split_first() {
        Some((layer, next)) => {
            layer.handle(scope, &action);
            run_chain(next, scope, action)
        }
        None => scope.base().dispatch(action),
    }
}

/// Middleware that logs every action passing through the chain
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Include the action's payload in the log line
    pub log_payload: bool,
}

impl LoggingMiddleware {
    /// Log action names only
    pub fn new() -> Self {
        Self { log_payload: false }
    }

    /// Log action names and payloads
    pub fn verbose() -> Self {
        Self { log_payload: true }
    }
}

impl<A: Action> Middleware<A> for LoggingMiddleware {
    fn handle(&self, _scope: &Scope<'_, A>, action: &A) {
        if self.log_payload {
            tracing::debug!(
                action = %action.name(),
                payload = ?action.payload(),
                "action"
            );
        } else {
            tracing::debug!(action = %action.name(), "action");
        }
    }
}
