//! Action trait and action-type keys

use std::borrow::Borrow;
use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

/// Marker trait for actions that can be dispatched through a composed dispatch
///
/// Actions are discriminated events. They should be:
/// - Clone: Actions are recorded by the observer and handed to handlers
/// - Debug: For logging
/// - Send + Sync + 'static: Handlers may dispatch from spawned tasks
///
/// Use `#[derive(Action)]` from `reader-dispatch-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// Payload carried by payload-bearing actions.
    type Payload: Clone + Debug + Send + Sync + 'static;

    /// The action type key used to route the action to handlers.
    fn name(&self) -> &str;

    /// The payload, if this action carries one.
    ///
    /// Presence is explicit: `Some(0)` or `Some(false)` is a present payload.
    fn payload(&self) -> Option<Self::Payload>;

    /// Whether a payload is set on this action.
    fn has_payload(&self) -> bool {
        self.payload().is_some()
    }

    /// The action type as an owned key.
    fn action_type(&self) -> ActionType {
        ActionType::new(self.name())
    }
}

/// Identifies a kind of action for handler registration and observation.
///
/// Two actions share a type iff their [`Action::name`] values are equal.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(String);

impl ActionType {
    /// Create a new action type key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty (never valid for registration).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `action` is of this type.
    pub fn matches<A: Action>(&self, action: &A) -> bool {
        action.name() == self.0
    }
}

impl Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ActionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for ActionType {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum TestAction {
        SetCount(i64),
        Reset,
    }

    impl Action for TestAction {
        type Payload = i64;

        fn name(&self) -> &str {
            match self {
                TestAction::SetCount(_) => "SET_COUNT",
                TestAction::Reset => "RESET",
            }
        }

        fn payload(&self) -> Option<i64> {
            match self {
                TestAction::SetCount(n) => Some(*n),
                TestAction::Reset => None,
            }
        }
    }

    #[test]
    fn test_action_type_conversions() {
        let a = ActionType::new("SET_COUNT");
        let b = ActionType::from("SET_COUNT");
        let c: ActionType = String::from("SET_COUNT").into();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.name(), "SET_COUNT");
        assert_eq!(a.to_string(), "SET_COUNT");
        assert!(ActionType::new("").is_empty());
    }

    #[test]
    fn test_matches_by_name_only() {
        let key = ActionType::from("SET_COUNT");
        assert!(key.matches(&TestAction::SetCount(1)));
        assert!(!key.matches(&TestAction::Reset));
        assert!(!ActionType::from("SET_").matches(&TestAction::SetCount(1)));
    }

    #[test]
    fn test_zero_payload_is_present() {
        assert!(TestAction::SetCount(0).has_payload());
        assert!(!TestAction::Reset.has_payload());
        assert_eq!(TestAction::Reset.action_type(), ActionType::from("RESET"));
    }

    #[test]
    fn test_action_type_serializes_as_string() {
        let json = serde_json::to_string(&ActionType::from("RESET")).unwrap();
        assert_eq!(json, "\"RESET\"");
    }
}
