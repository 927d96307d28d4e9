//! Tests for #[derive(Action)] macro

use reader_dispatch::Action;
use reader_dispatch::Action as ActionMacro;

#[test]
fn test_default_names_and_no_payload() {
    #[derive(ActionMacro, Clone, Debug)]
    enum Nav {
        NextItem,
        Select(usize),
        Jump { line: u32 },
    }

    assert_eq!(Nav::NextItem.name(), "NextItem");
    assert_eq!(Nav::Select(3).name(), "Select");
    assert_eq!(Nav::Jump { line: 1 }.name(), "Jump");

    // no payload type declared: nothing carries a payload
    assert_eq!(Nav::Select(3).payload(), None);
    assert!(!Nav::NextItem.has_payload());
}

#[test]
fn test_screaming_snake_case_and_payload() {
    #[derive(ActionMacro, Clone, Debug)]
    #[action(payload = "i64", rename_all = "SCREAMING_SNAKE_CASE")]
    enum Count {
        SetCount(i64),
        Add(i64),
        RunNameHandler,
    }

    assert_eq!(Count::SetCount(1).name(), "SET_COUNT");
    assert_eq!(Count::Add(5).name(), "ADD");
    assert_eq!(Count::RunNameHandler.name(), "RUN_NAME_HANDLER");

    assert_eq!(Count::Add(5).payload(), Some(5));
    assert_eq!(Count::RunNameHandler.payload(), None);
    assert_eq!(Count::Add(5).action_type().name(), "ADD");
}

#[test]
fn test_falsy_payloads_are_present() {
    #[derive(ActionMacro, Clone, Debug)]
    #[action(payload = "i64")]
    enum Count {
        Set(i64),
    }

    #[derive(ActionMacro, Clone, Debug)]
    #[action(payload = "String")]
    enum Text {
        Set(String),
    }

    #[derive(ActionMacro, Clone, Debug)]
    #[action(payload = "bool")]
    enum Flag {
        Set(bool),
    }

    assert_eq!(Count::Set(0).payload(), Some(0));
    assert_eq!(Text::Set(String::new()).payload(), Some(String::new()));
    assert_eq!(Flag::Set(false).payload(), Some(false));
    assert!(Flag::Set(false).has_payload());
}

#[test]
fn test_variant_overrides() {
    #[derive(ActionMacro, Clone, Debug)]
    #[action(payload = "String", rename_all = "snake_case")]
    enum Profile {
        SetName(String),
        #[action(rename = "PROFILE/RESET")]
        Reset,
        #[action(skip_payload)]
        Log(String),
        Rename { from: String, to: String },
    }

    assert_eq!(Profile::SetName("a".into()).name(), "set_name");
    assert_eq!(Profile::Reset.name(), "PROFILE/RESET");
    assert_eq!(Profile::Log("x".into()).payload(), None);
    assert_eq!(
        Profile::Rename {
            from: "a".into(),
            to: "b".into()
        }
        .payload(),
        None
    );
    assert_eq!(Profile::SetName("a".into()).payload(), Some("a".to_string()));
}

#[test]
fn test_fields_convert_into_shared_payload() {
    #[derive(Clone, Debug, PartialEq)]
    enum Value {
        Count(i64),
        Text(String),
    }

    impl From<i64> for Value {
        fn from(n: i64) -> Self {
            Value::Count(n)
        }
    }

    impl From<String> for Value {
        fn from(s: String) -> Self {
            Value::Text(s)
        }
    }

    #[derive(ActionMacro, Clone, Debug)]
    #[action(payload = "Value", rename_all = "SCREAMING_SNAKE_CASE")]
    enum Mixed {
        SetCount(i64),
        SetName(String),
        Direct(Value),
        Clear,
    }

    assert_eq!(Mixed::SetCount(0).payload(), Some(Value::Count(0)));
    assert_eq!(
        Mixed::SetName("Bob".into()).payload(),
        Some(Value::Text("Bob".into()))
    );
    assert_eq!(Mixed::Direct(Value::Count(3)).payload(), Some(Value::Count(3)));
    assert_eq!(Mixed::Clear.payload(), None);
    assert!(Mixed::SetName(String::new()).has_payload());
}
