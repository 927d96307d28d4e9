//! Dispatch handles and handler dependencies

use std::fmt;
use std::sync::Arc;

use crate::Action;

/// A clonable dispatch function.
///
/// This is the Rust form of a host's dispatch primitive: the base dispatch
/// of a [`Store`](crate::Store), the dispatch handed to handlers, and a
/// composed dispatch are all `Dispatcher`s, so any of them can be used
/// wherever another is expected.
pub struct Dispatcher<A> {
    inner: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl<A: Action> Dispatcher<A> {
    /// Wrap a dispatch function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// A dispatcher that drops every action.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Dispatch an action.
    pub fn dispatch(&self, action: A) {
        (self.inner)(action)
    }

    /// Whether two handles point at the same dispatch function.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Dependencies injected into handlers.
///
/// Every dependency object carries the dispatch function; a dependency
/// factory extends it with whatever else the handler needs.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct CountDeps {
///     dispatch: Dispatcher<CountAction>,
///     bonus: i64,
/// }
///
/// impl Dependencies<CountAction> for CountDeps {
///     fn dispatcher(&self) -> &Dispatcher<CountAction> {
///         &self.dispatch
///     }
/// }
///
/// let factory = |dispatch| CountDeps { dispatch, bonus: 2 };
/// ```
pub trait Dependencies<A: Action>: Send + 'static {
    /// The dispatch function handed to the handler.
    fn dispatcher(&self) -> &Dispatcher<A>;

    /// Shorthand for `self.dispatcher().dispatch(action)`.
    fn dispatch(&self, action: A) {
        self.dispatcher().dispatch(action)
    }
}

impl<A: Action> Dependencies<A> for Dispatcher<A> {
    fn dispatcher(&self) -> &Dispatcher<A> {
        self
    }
}

/// Builds a dependency object from the current dispatch function.
pub type DependencyFactory<A, D> = Arc<dyn Fn(Dispatcher<A>) -> D + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Ping(u8);

    impl Action for Ping {
        type Payload = u8;

        fn name(&self) -> &str {
            "PING"
        }

        fn payload(&self) -> Option<u8> {
            Some(self.0)
        }
    }

    #[test]
    fn test_dispatcher_forwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatcher = Dispatcher::new(move |a: Ping| sink.lock().push(a));

        dispatcher.dispatch(Ping(1));
        dispatcher.clone().dispatch(Ping(2));

        assert_eq!(*seen.lock(), vec![Ping(1), Ping(2)]);
    }

    #[test]
    fn test_dispatcher_is_its_own_dependency() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let dispatcher = Dispatcher::new(move |_: Ping| *sink.lock() += 1);

        Dependencies::dispatch(&dispatcher, Ping(0));

        assert!(dispatcher.dispatcher().same(&dispatcher));
        assert_eq!(*seen.lock(), 1);
    }
}
