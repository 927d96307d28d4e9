//! Handler registry and action matching
//!
//! Registrations are keyed by [`ActionType`] and kept in registration order.
//! Registering a type that is already present is a no-op, so calling
//! registration code repeatedly (on every render, say) never grows the
//! middleware chain.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::action::{Action, ActionType};
use crate::dispatcher::{Dependencies, DependencyFactory, Dispatcher};
use crate::effect::{Context, Effect, Handler, Thunk};
use crate::error::RegistryError;
use crate::middleware::{Middleware, Scope};

/// Outcome of a registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The handler was added to the chain.
    Added,
    /// A handler for this type already exists; nothing changed.
    AlreadyRegistered,
}

impl Registration {
    /// Whether the call added a handler.
    pub fn is_added(self) -> bool {
        self == Registration::Added
    }
}

/// How a registration obtains its dependencies.
pub enum DependencySource<A, D> {
    /// The bare (observable) dispatch function.
    Dispatch(fn(Dispatcher<A>) -> D),
    /// A caller-supplied dependency factory.
    Factory(DependencyFactory<A, D>),
}

impl<A: Action, D> DependencySource<A, D> {
    /// Whether dependencies are an injected object.
    pub fn is_injected(&self) -> bool {
        matches!(self, DependencySource::Factory(_))
    }

    /// Build dependencies for one invocation.
    pub fn resolve(&self, dispatch: Dispatcher<A>) -> D {
        match self {
            DependencySource::Dispatch(wrap) => wrap(dispatch),
            DependencySource::Factory(factory) => factory(dispatch),
        }
    }
}

impl<A> DependencySource<A, Dispatcher<A>> {
    /// Hand handlers the dispatch function itself.
    pub fn dispatch() -> Self {
        DependencySource::Dispatch(std::convert::identity)
    }
}

impl<A, D> Clone for DependencySource<A, D> {
    fn clone(&self) -> Self {
        match self {
            DependencySource::Dispatch(wrap) => DependencySource::Dispatch(*wrap),
            DependencySource::Factory(factory) => DependencySource::Factory(Arc::clone(factory)),
        }
    }
}

/// A handler registration: type, handler and optional dependency factory.
pub struct PreEffect<A: Action, D> {
    action_type: ActionType,
    handler: Handler<A::Payload, D>,
    dependencies: DependencySource<A, D>,
}

impl<A: Action, D> fmt::Debug for PreEffect<A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreEffect")
            .field("action_type", &self.action_type)
            .field("injected", &self.dependencies.is_injected())
            .finish_non_exhaustive()
    }
}

impl<A: Action, D: Dependencies<A>> PreEffect<A, D> {
    /// Create a registration.
    pub fn new(
        action_type: impl Into<ActionType>,
        handler: Handler<A::Payload, D>,
        dependencies: DependencySource<A, D>,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            handler,
            dependencies,
        }
    }

    /// The registered action type.
    pub fn action_type(&self) -> &ActionType {
        &self.action_type
    }

    /// Whether this registration routes `action`.
    ///
    /// Exact type equality only: no wildcard or prefix matching.
    pub fn matches(&self, action: &A) -> bool {
        self.action_type.matches(action)
    }

    /// Resolve dependencies and payload into a classified effect.
    pub fn to_effect(&self, action: &A, dispatch: Dispatcher<A>) -> Effect<A::Payload, D> {
        Effect::classify(
            action.payload(),
            self.dependencies.resolve(dispatch),
            self.dependencies.is_injected(),
        )
    }
}

impl<A: Action, D: Dependencies<A>> Middleware<A> for PreEffect<A, D> {
    fn handle(&self, scope: &Scope<'_, A>, action: &A) {
        if !self.matches(action) {
            return;
        }

        let effect = self.to_effect(action, scope.observable(&self.action_type));
        let kind = effect.kind();
        tracing::debug!(
            action = %action.name(),
            kind = %kind,
            "running handler"
        );

        let completion = effect.run(&self.handler);
        scope.track(&self.action_type, kind, completion);
    }

    fn action_type(&self) -> Option<&ActionType> {
        Some(&self.action_type)
    }
}

/// Ordered, idempotent set of handler registrations.
pub struct Registry<A: Action> {
    layers: Vec<Arc<dyn Middleware<A>>>,
    types: HashSet<ActionType>,
}

impl<A: Action> fmt::Debug for Registry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types())
            .finish()
    }
}

impl<A: Action> Default for Registry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> Registry<A> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            types: HashSet::new(),
        }
    }

    /// Register a handler that receives the bare dispatch function.
    pub fn register<F>(
        &mut self,
        action_type: impl Into<ActionType>,
        handler: F,
    ) -> Result<Registration, RegistryError>
    where
        F: Fn(Context<A::Payload, Dispatcher<A>>) -> Thunk + Send + Sync + 'static,
    {
        self.insert(PreEffect::<A, Dispatcher<A>>::new(
            action_type,
            Arc::new(handler),
            DependencySource::dispatch(),
        ))
    }

    /// Register a handler with a dependency factory.
    pub fn register_with<F, G, D>(
        &mut self,
        action_type: impl Into<ActionType>,
        handler: F,
        factory: G,
    ) -> Result<Registration, RegistryError>
    where
        D: Dependencies<A>,
        F: Fn(Context<A::Payload, D>) -> Thunk + Send + Sync + 'static,
        G: Fn(Dispatcher<A>) -> D + Send + Sync + 'static,
    {
        self.insert(PreEffect::<A, D>::new(
            action_type,
            Arc::new(handler),
            DependencySource::Factory(Arc::new(factory)),
        ))
    }

    /// Insert a prepared registration.
    pub fn insert<D: Dependencies<A>>(
        &mut self,
        pre_effect: PreEffect<A, D>,
    ) -> Result<Registration, RegistryError> {
        let action_type = pre_effect.action_type().clone();
        if action_type.is_empty() {
            return Err(RegistryError::EmptyActionType);
        }
        if self.types.contains(&action_type) {
            tracing::trace!(action = %action_type, "handler already registered");
            return Ok(Registration::AlreadyRegistered);
        }

        tracing::debug!(action = %action_type, "registering handler");
        self.types.insert(action_type);
        self.layers.push(Arc::new(pre_effect));
        Ok(Registration::Added)
    }

    /// Append a layer that is not tied to an action type.
    pub fn push_layer(&mut self, layer: Arc<dyn Middleware<A>>) {
        self.layers.push(layer);
    }

    /// Whether a handler is registered for `action_type`.
    pub fn contains(&self, action_type: &str) -> bool {
        self.types.contains(action_type)
    }

    /// Registered types in registration order.
    pub fn types(&self) -> Vec<&ActionType> {
        self.layers
            .iter()
            .filter_map(|layer| layer.action_type())
            .collect()
    }

    /// Snapshot of the middleware chain, outermost first.
    pub fn layers(&self) -> Vec<Arc<dyn Middleware<A>>> {
        self.layers.clone()
    }

    /// Number of layers, handler registrations included.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Drop all registrations.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum TestAction {
        Add(i64),
        Clear,
    }

    impl Action for TestAction {
        type Payload = i64;

        fn name(&self) -> &str {
            match self {
                TestAction::Add(_) => "ADD",
                TestAction::Clear => "CLEAR",
            }
        }

        fn payload(&self) -> Option<i64> {
            match self {
                TestAction::Add(n) => Some(*n),
                TestAction::Clear => None,
            }
        }
    }

    #[derive(Clone)]
    struct Deps {
        dispatch: Dispatcher<TestAction>,
        bonus: i64,
    }

    impl Dependencies<TestAction> for Deps {
        fn dispatcher(&self) -> &Dispatcher<TestAction> {
            &self.dispatch
        }
    }

    fn noop(_: Context<i64, Dispatcher<TestAction>>) -> Thunk {
        Thunk::noop()
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = Registry::<TestAction>::new();

        assert_eq!(registry.register("ADD", noop), Ok(Registration::Added));
        assert_eq!(
            registry.register("ADD", noop),
            Ok(Registration::AlreadyRegistered)
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("ADD"));
    }

    #[test]
    fn test_empty_type_rejected() {
        let mut registry = Registry::<TestAction>::new();
        assert_eq!(
            registry.register("", noop),
            Err(RegistryError::EmptyActionType)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = Registry::<TestAction>::new();
        registry.register("CLEAR", noop).unwrap();
        registry.register("ADD", noop).unwrap();

        let types: Vec<_> = registry.types().into_iter().map(|t| t.name()).collect();
        assert_eq!(types, vec!["CLEAR", "ADD"]);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains("ADD"));
    }

    #[test]
    fn test_pre_effect_matches_exact_type() {
        let pre = PreEffect::<TestAction, _>::new(
            "ADD",
            Arc::new(noop) as Handler<i64, Dispatcher<TestAction>>,
            DependencySource::dispatch(),
        );

        assert!(pre.matches(&TestAction::Add(1)));
        assert!(!pre.matches(&TestAction::Clear));
    }

    #[test]
    fn test_to_effect_uses_factory() {
        let pre = PreEffect::<TestAction, Deps>::new(
            "ADD",
            Arc::new(|_: Context<i64, Deps>| Thunk::noop()),
            DependencySource::Factory(Arc::new(|dispatch| Deps { dispatch, bonus: 2 })),
        );

        let effect = pre.to_effect(&TestAction::Add(0), Dispatcher::noop());
        match effect {
            Effect::PayloadDependency {
                payload,
                dependencies,
            } => {
                assert_eq!(payload, 0);
                assert_eq!(dependencies.bonus, 2);
            }
            other => panic!("unexpected effect: {:?}", other.kind()),
        }

        let effect = pre.to_effect(&TestAction::Clear, Dispatcher::noop());
        assert_eq!(effect.kind(), crate::EffectKind::DependencyOnly);
    }
}
