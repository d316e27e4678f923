//! Per-field operator overrides.
//!
//! A rule engine may register replacement implementations for the four
//! string operators whose semantics depend on the field being compared (a
//! field holding paths might compare case-insensitively on one platform and
//! not on another). The dispatch functions here pick the override for the
//! field read by either operand, or the stock operator when there is none.

use std::fmt;

use crate::error::Result;
use crate::evaluator::{
    BoolEvaluator, StringArrayEvaluator, StringEvaluator, StringValuesEvaluator,
};
use crate::operators;
use crate::opts::Opts;
use crate::state::State;

pub type StringEqualsFn =
    fn(&StringEvaluator, &StringEvaluator, &Opts, &mut State) -> Result<BoolEvaluator>;
pub type StringValuesContainsFn =
    fn(&StringEvaluator, &StringValuesEvaluator, &Opts, &mut State) -> Result<BoolEvaluator>;
pub type StringArrayContainsFn =
    fn(&StringEvaluator, &StringArrayEvaluator, &Opts, &mut State) -> Result<BoolEvaluator>;
pub type StringArrayMatchesFn =
    fn(&StringArrayEvaluator, &StringValuesEvaluator, &Opts, &mut State) -> Result<BoolEvaluator>;

/// Replacement operators for one field. Unset entries use the defaults.
#[derive(Clone, Copy, Default)]
pub struct OpOverrides {
    pub string_equals: Option<StringEqualsFn>,
    pub string_values_contains: Option<StringValuesContainsFn>,
    pub string_array_contains: Option<StringArrayContainsFn>,
    pub string_array_matches: Option<StringArrayMatchesFn>,
}

impl fmt::Debug for OpOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpOverrides")
            .field("string_equals", &self.string_equals.is_some())
            .field("string_values_contains", &self.string_values_contains.is_some())
            .field("string_array_contains", &self.string_array_contains.is_some())
            .field("string_array_matches", &self.string_array_matches.is_some())
            .finish()
    }
}

/// `a == b`, overridable.
pub fn string_equals(
    a: &StringEvaluator,
    b: &StringEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let op = opts
        .overrides_for([a.field(), b.field()])
        .and_then(|o| o.string_equals)
        .unwrap_or(operators::string_equals);
    op(a, b, opts, state)
}

/// `a in b` against a pattern set, overridable.
pub fn string_values_contains(
    a: &StringEvaluator,
    b: &StringValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let op = opts
        .overrides_for([a.field(), b.field()])
        .and_then(|o| o.string_values_contains)
        .unwrap_or(operators::string_values_contains);
    op(a, b, opts, state)
}

/// `a in b` against a string array, overridable.
pub fn string_array_contains(
    a: &StringEvaluator,
    b: &StringArrayEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let op = opts
        .overrides_for([a.field(), b.field()])
        .and_then(|o| o.string_array_contains)
        .unwrap_or(operators::string_array_contains);
    op(a, b, opts, state)
}

/// Weak array match against a pattern set, overridable.
pub fn string_array_matches(
    a: &StringArrayEvaluator,
    b: &StringValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let op = opts
        .overrides_for([a.field(), b.field()])
        .and_then(|o| o.string_array_matches)
        .unwrap_or(operators::string_array_matches);
    op(a, b, opts, state)
}
