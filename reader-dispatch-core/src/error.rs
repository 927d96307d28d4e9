//! Error types

use std::time::Duration;

use thiserror::Error;

/// Errors returned when registering a handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("cannot register a handler for an empty action type")]
    EmptyActionType,
}

/// Errors produced while running a handler's completion.
///
/// These never reach the dispatch caller; they are recorded as
/// [`HandlerFailure`](crate::HandlerFailure)s for the observer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("async handler completion requires a tokio runtime")]
    NoRuntime,

    #[error("async handler panicked before settling")]
    HandlerPanicked,
}

/// Errors returned by [`Observer::observe`](crate::Observer::observe).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserveError {
    #[error(
        "attempt to observe execution state failed: {pending} handler operation(s) \
         did not settle after {retries} retries ({waited:?}); check logs for handler failures"
    )]
    Unresolved {
        pending: usize,
        retries: u32,
        waited: Duration,
    },
}
