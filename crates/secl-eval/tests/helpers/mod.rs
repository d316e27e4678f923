use secl_eval::{BoolEvaluator, Context, Opts, State, StringEvaluator, operators};
use serde_json::Value;

pub fn eval(rule: &BoolEvaluator, event_json: Value) -> bool {
    let ctx = Context::from_value(&event_json);
    rule.eval(&ctx)
}

pub fn field(name: &str) -> StringEvaluator {
    StringEvaluator::field_read(name)
}

pub fn lit(value: &str) -> StringEvaluator {
    StringEvaluator::constant(value.to_string())
}

/// `field == literal`, composed with default options.
pub fn field_equals(state: &mut State, name: &str, literal: StringEvaluator) -> BoolEvaluator {
    operators::string_equals(&field(name), &literal, &Opts::default(), state).unwrap()
}
