//! Field-scoped partial evaluation.
//!
//! A rule compiled with [`State::for_field`](crate::state::State::for_field)
//! can be asked whether an event might match knowing only that one field's
//! value. Rule engines use this with the values registered in the state to
//! decide which values of a field can be used to pre-filter events.

use serde_json::{Map, Value};

use crate::context::Context;
use crate::evaluator::BoolEvaluator;
use crate::state::{FieldValue, LiteralValue, ValueType};

/// Whether an event whose only known value is `field`'s might satisfy `root`.
///
/// A root that is not deterministic for `field` depends on other fields and
/// might always match, so the answer is `true` without evaluating it.
pub fn partial_eval(root: &BoolEvaluator, field: &str, ctx: &Context<'_>) -> bool {
    if !root.is_deterministic_for(Some(field)) {
        return true;
    }
    root.eval(ctx)
}

/// Build a one-field event carrying a registered value.
///
/// Pattern, glob and regex values describe sets of strings, not a value an
/// event can carry, and yield `None`.
pub fn field_value_context(field: &str, value: &FieldValue) -> Option<Value> {
    if matches!(
        value.value_type,
        ValueType::Pattern | ValueType::Glob | ValueType::Regexp
    ) {
        return None;
    }

    let json = match &value.value {
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Int(i) => Value::from(*i),
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::IpNet(net) => Value::String(net.to_string()),
    };
    let mut map = Map::new();
    map.insert(field.to_string(), json);
    Some(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{IntEvaluator, StringEvaluator};
    use crate::operators;
    use crate::opts::Opts;
    use crate::state::State;
    use serde_json::json;

    #[test]
    fn test_deterministic_root_is_evaluated() {
        let mut state = State::for_field("process.name");
        let root = operators::string_equals(
            &StringEvaluator::field_read("process.name"),
            &StringEvaluator::constant("ls".into()),
            &Opts::default(),
            &mut state,
        )
        .unwrap();

        let hit = json!({"process.name": "ls"});
        let miss = json!({"process.name": "cat"});
        assert!(partial_eval(&root, "process.name", &Context::from_value(&hit)));
        assert!(!partial_eval(&root, "process.name", &Context::from_value(&miss)));
    }

    #[test]
    fn test_other_field_root_might_match() {
        let mut state = State::for_field("process.name");
        let root = operators::int_equals(
            &IntEvaluator::field_read("process.pid"),
            &IntEvaluator::constant(1),
            &Opts::default(),
            &mut state,
        )
        .unwrap();
        let ev = json!({"process.name": "ls"});
        assert!(partial_eval(&root, "process.name", &Context::from_value(&ev)));
    }

    #[test]
    fn test_field_value_context() {
        let ev = field_value_context("a.b", &FieldValue::scalar("x")).unwrap();
        assert_eq!(ev, json!({"a.b": "x"}));
        assert_eq!(Context::from_value(&ev).read::<String>("a.b"), "x");

        let ev = field_value_context("n", &FieldValue::new(3, ValueType::Range)).unwrap();
        assert_eq!(ev, json!({"n": 3}));

        let net = "10.0.0.0/8".parse().unwrap();
        let ev = field_value_context("ip", &FieldValue::ip_net(net)).unwrap();
        assert_eq!(ev, json!({"ip": "10.0.0.0/8"}));

        assert!(field_value_context("p", &FieldValue::new("/usr/*", ValueType::Glob)).is_none());
    }

    #[test]
    fn test_registered_values_round_trip() {
        let mut state = State::for_field("process.name");
        let root = operators::string_array_contains(
            &StringEvaluator::field_read("process.name"),
            &crate::evaluator::StringArrayEvaluator::constant(vec!["bash".into(), "zsh".into()]),
            &Opts::default(),
            &mut state,
        )
        .unwrap();

        for fv in state.field_values("process.name") {
            let ev = field_value_context("process.name", fv).unwrap();
            assert!(partial_eval(&root, "process.name", &Context::from_value(&ev)));
        }
    }
}
