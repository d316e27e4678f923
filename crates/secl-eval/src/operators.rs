//! Operator composition.
//!
//! Each operator takes already-compiled operand evaluators and produces the
//! evaluator for the operator node, choosing the cheapest strategy:
//!
//! - both operands constant: the result is folded to a constant;
//! - one side constant: the result closes over the frozen literal, and if
//!   the other side reads a named field the literal is registered into the
//!   [`State`] for that field;
//! - both computed: the result evaluates both sides per event.
//!
//! Literal strings are compiled into matchers here, once, never per event.
//! All binary operators share [`lift`], parameterized by the element
//! comparison; any/all operator pairs differ only in that comparison.

use std::sync::Arc;

use ipnet::IpNet;

use crate::cidr::{CidrValues, ip_nets_match};
use crate::error::Result;
use crate::evaluator::{
    BoolArrayEvaluator, BoolEvaluator, CidrEvaluator, CidrValuesEvaluator, Eval, Evaluator,
    IntArrayEvaluator, IntEvaluator, StringArrayEvaluator, StringEvaluator,
    StringValuesEvaluator, computation,
};
use crate::matcher::{StringMatcher, eq_fold};
use crate::opts::Opts;
use crate::state::{FieldValue, IntoFieldValues, State, ValueType};
use crate::values::{CompiledStringValues, StringValues};

// =============================================================================
// Shared combination logic
// =============================================================================

/// Whether a binary node is deterministic for the field being specialized.
///
/// At least one operand must be, and neither may read another field.
fn is_arith_deterministic<A, B>(a: &Evaluator<A>, b: &Evaluator<B>, state: &State) -> bool {
    let field = state.field();
    let is_dc = a.is_deterministic_for(field) || b.is_deterministic_for(field);

    let reads_other = |f: Option<&str>| matches!((f, field), (Some(f), Some(sf)) if f != sf);
    is_dc && !reads_other(a.field()) && !reads_other(b.field())
}

fn register(state: &mut State, field: &str, values: Vec<FieldValue>) -> Result<()> {
    for value in values {
        state.update_field_values(field, value)?;
    }
    Ok(())
}

/// Lift an element comparison into an evaluator combinator.
///
/// `set_len` is the size of `b` when `b` is a literal set scanned linearly;
/// each element adds `opts.in_array_weight` to the node weight.
fn lift<A, B, F>(
    a: &Evaluator<A>,
    b: &Evaluator<B>,
    opts: &Opts,
    state: &mut State,
    set_len: Option<usize>,
    cmp: F,
) -> Result<BoolEvaluator>
where
    A: Clone + IntoFieldValues + Send + Sync + 'static,
    B: Clone + IntoFieldValues + Send + Sync + 'static,
    F: Fn(&A, &B) -> bool + Send + Sync + 'static,
{
    let is_dc = is_arith_deterministic(a, b, state);
    let weight = a
        .weight()
        .saturating_add(b.weight())
        .saturating_add(set_len.map_or(0, |n| opts.in_array_weight.saturating_mul(n)));

    let eval = match (a.eval_kind(), b.eval_kind()) {
        (Eval::Computed(ea), Eval::Computed(eb)) => {
            let (ea, eb) = (Arc::clone(ea), Arc::clone(eb));
            Eval::Computed(computation(move |ctx| cmp(&ea(ctx), &eb(ctx))))
        }
        (Eval::Constant(va), Eval::Constant(vb)) => Eval::Constant(cmp(va, vb)),
        (Eval::Computed(ea), Eval::Constant(vb)) => {
            if let Some(field) = a.field() {
                register(state, field, vb.field_values(b.value_type()))?;
            }
            let (ea, vb) = (Arc::clone(ea), vb.clone());
            Eval::Computed(computation(move |ctx| cmp(&ea(ctx), &vb)))
        }
        (Eval::Constant(va), Eval::Computed(eb)) => {
            if let Some(field) = b.field() {
                register(state, field, va.field_values(a.value_type()))?;
            }
            let (va, eb) = (va.clone(), Arc::clone(eb));
            Eval::Computed(computation(move |ctx| cmp(&va, &eb(ctx))))
        }
    };

    Ok(BoolEvaluator::composed(eval, weight, is_dc))
}

// =============================================================================
// String comparison selection
// =============================================================================

/// Element comparison for two strings.
#[derive(Debug, Clone)]
enum StrCmp {
    Exact,
    Fold,
    /// The right operand was compiled; test the left value against it.
    MatchLeft(StringMatcher),
    /// The left operand was compiled; test the right value against it.
    MatchRight(StringMatcher),
}

impl StrCmp {
    fn apply(&self, a: &str, b: &str) -> bool {
        match self {
            StrCmp::Exact => a == b,
            StrCmp::Fold => eq_fold(a, b),
            StrCmp::MatchLeft(m) => m.matches(a),
            StrCmp::MatchRight(m) => m.matches(b),
        }
    }
}

fn fallback_cmp<A, B>(a: &Evaluator<A>, b: &Evaluator<B>) -> StrCmp {
    if a.string_cmp_opts().scalar_case_insensitive || b.string_cmp_opts().scalar_case_insensitive
    {
        StrCmp::Fold
    } else {
        StrCmp::Exact
    }
}

/// Choose how two string operands are compared.
///
/// A literal facing a field read is compiled with the options of both
/// sides. Two field reads compare plainly, folded if either side asks.
fn select_str_cmp(a: &StringEvaluator, b: &StringEvaluator) -> Result<StrCmp> {
    let compiled = match (a.field(), b.field()) {
        (Some(_), Some(_)) => None,
        (Some(_), None) => b
            .to_string_matcher(a.string_cmp_opts())?
            .map(StrCmp::MatchLeft),
        (None, Some(_)) => a
            .to_string_matcher(b.string_cmp_opts())?
            .map(StrCmp::MatchRight),
        (None, None) => match b.to_string_matcher(a.string_cmp_opts())? {
            Some(m) => Some(StrCmp::MatchLeft(m)),
            None => a
                .to_string_matcher(b.string_cmp_opts())?
                .map(StrCmp::MatchRight),
        },
    };
    Ok(compiled.unwrap_or_else(|| fallback_cmp(a, b)))
}

// =============================================================================
// String operators
// =============================================================================

/// `a == b` on strings.
pub fn string_equals(
    a: &StringEvaluator,
    b: &StringEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let cmp = select_str_cmp(a, b)?;
    lift(a, b, opts, state, None, move |x: &String, y: &String| {
        cmp.apply(x, y)
    })
}

/// `a in b` where `b` is an array of strings.
///
/// A literal `a` facing an array field is compiled and run against each
/// element.
pub fn string_array_contains(
    a: &StringEvaluator,
    b: &StringArrayEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let compiled = match a.field() {
        None => a
            .to_string_matcher(b.string_cmp_opts())?
            .map(StrCmp::MatchRight),
        Some(_) => None,
    };
    let cmp = compiled.unwrap_or_else(|| fallback_cmp(a, b));

    let set_len = b.constant_value().map(Vec::len);
    lift(a, b, opts, state, set_len, move |x: &String, ys: &Vec<String>| {
        ys.iter().any(|y| cmp.apply(x, y))
    })
}

/// Membership test against a string set.
///
/// A literal set is compiled here, once per composition, with the options
/// of both operands. A set read from the event holds plain values and is
/// compared member by member, folding case if either operand asks.
struct SetMatcher {
    compiled: Option<CompiledStringValues>,
    fold: bool,
}

impl SetMatcher {
    fn new<A>(a: &Evaluator<A>, b: &StringValuesEvaluator) -> Result<Self> {
        let cmp_opts = a.string_cmp_opts().union(b.string_cmp_opts());
        let compiled = b
            .constant_value()
            .map(|values| values.compile(cmp_opts))
            .transpose()?;
        Ok(SetMatcher {
            compiled,
            fold: cmp_opts.scalar_case_insensitive,
        })
    }

    fn matches(&self, set: &StringValues, value: &str) -> bool {
        match &self.compiled {
            Some(compiled) => compiled.matches(value),
            None => set.matches_scalar(value, self.fold),
        }
    }
}

/// `a in b` where `b` is a pattern set.
pub fn string_values_contains(
    a: &StringEvaluator,
    b: &StringValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let matcher = SetMatcher::new(a, b)?;

    let set_len = b.constant_value().map(StringValues::len);
    lift(a, b, opts, state, set_len, move |x: &String, set: &StringValues| {
        matcher.matches(set, x)
    })
}

fn string_array_matches_with(
    a: &StringArrayEvaluator,
    b: &StringValuesEvaluator,
    opts: &Opts,
    state: &mut State,
    array_op: fn(&[String], &dyn Fn(&str) -> bool) -> bool,
) -> Result<BoolEvaluator> {
    let matcher = SetMatcher::new(a, b)?;

    let set_len = b.constant_value().map(StringValues::len);
    lift(a, b, opts, state, set_len, move |xs: &Vec<String>, set: &StringValues| {
        array_op(xs, &|x: &str| matcher.matches(set, x))
    })
}

/// Weak match: at least one element of `a` matches the set `b`.
///
/// Elements of `a` are plain strings; only `b` is compiled.
pub fn string_array_matches(
    a: &StringArrayEvaluator,
    b: &StringValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    string_array_matches_with(a, b, opts, state, |xs, matches| {
        xs.iter().any(|x| matches(x.as_str()))
    })
}

/// Every element of `a` matches the set `b`.
pub fn all_string_array_matches(
    a: &StringArrayEvaluator,
    b: &StringValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    string_array_matches_with(a, b, opts, state, |xs, matches| {
        xs.iter().all(|x| matches(x.as_str()))
    })
}

// =============================================================================
// Integer and boolean operators
// =============================================================================

/// `a == b` on integers.
pub fn int_equals(
    a: &IntEvaluator,
    b: &IntEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    lift(a, b, opts, state, None, |x: &i64, y: &i64| x == y)
}

fn int_compare(
    a: &IntEvaluator,
    b: &IntEvaluator,
    opts: &Opts,
    state: &mut State,
    op: fn(i64, i64) -> bool,
) -> Result<BoolEvaluator> {
    // Bounds of ordered comparisons are registered as ranges.
    let a = a.clone().with_value_type(ValueType::Range);
    let b = b.clone().with_value_type(ValueType::Range);
    lift(&a, &b, opts, state, None, move |x: &i64, y: &i64| op(*x, *y))
}

/// `a > b`
pub fn int_greater(a: &IntEvaluator, b: &IntEvaluator, opts: &Opts, state: &mut State) -> Result<BoolEvaluator> {
    int_compare(a, b, opts, state, |x, y| x > y)
}

/// `a >= b`
pub fn int_greater_or_equal(a: &IntEvaluator, b: &IntEvaluator, opts: &Opts, state: &mut State) -> Result<BoolEvaluator> {
    int_compare(a, b, opts, state, |x, y| x >= y)
}

/// `a < b`
pub fn int_lesser(a: &IntEvaluator, b: &IntEvaluator, opts: &Opts, state: &mut State) -> Result<BoolEvaluator> {
    int_compare(a, b, opts, state, |x, y| x < y)
}

/// `a <= b`
pub fn int_lesser_or_equal(a: &IntEvaluator, b: &IntEvaluator, opts: &Opts, state: &mut State) -> Result<BoolEvaluator> {
    int_compare(a, b, opts, state, |x, y| x <= y)
}

/// `a in b` where `b` is an array of integers.
pub fn int_array_contains(
    a: &IntEvaluator,
    b: &IntArrayEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let set_len = b.constant_value().map(Vec::len);
    lift(a, b, opts, state, set_len, |x: &i64, ys: &Vec<i64>| ys.contains(x))
}

fn int_array_matches_with(
    a: &IntArrayEvaluator,
    b: &IntArrayEvaluator,
    opts: &Opts,
    state: &mut State,
    array_op: fn(&[i64], &[i64]) -> bool,
) -> Result<BoolEvaluator> {
    let set_len = b.constant_value().map(Vec::len);
    lift(a, b, opts, state, set_len, move |xs: &Vec<i64>, ys: &Vec<i64>| {
        array_op(xs, ys)
    })
}

/// Weak match: at least one element of `a` appears in `b`.
pub fn int_array_matches(
    a: &IntArrayEvaluator,
    b: &IntArrayEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    int_array_matches_with(a, b, opts, state, |xs, ys| {
        xs.iter().any(|x| ys.contains(x))
    })
}

/// Every element of `a` appears in `b`.
pub fn all_int_array_matches(
    a: &IntArrayEvaluator,
    b: &IntArrayEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    int_array_matches_with(a, b, opts, state, |xs, ys| {
        xs.iter().all(|x| ys.contains(x))
    })
}

/// `a == b` on booleans.
pub fn bool_equals(
    a: &BoolEvaluator,
    b: &BoolEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    lift(a, b, opts, state, None, |x: &bool, y: &bool| x == y)
}

/// `a in b` where `b` is an array of booleans.
pub fn bool_array_contains(
    a: &BoolEvaluator,
    b: &BoolArrayEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    let set_len = b.constant_value().map(Vec::len);
    lift(a, b, opts, state, set_len, |x: &bool, ys: &Vec<bool>| ys.contains(x))
}

// =============================================================================
// CIDR operators
// =============================================================================

/// `a == b` on networks: one contains the other.
pub fn cidr_equals(
    a: &CidrEvaluator,
    b: &CidrEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    lift(a, b, opts, state, None, |x: &IpNet, y: &IpNet| ip_nets_match(x, y))
}

fn cidr_values_contains_with(
    a: &CidrEvaluator,
    b: &CidrValuesEvaluator,
    opts: &Opts,
    state: &mut State,
    array_op: fn(&IpNet, &CidrValues) -> bool,
) -> Result<BoolEvaluator> {
    let set_len = b.constant_value().map(CidrValues::len);
    lift(a, b, opts, state, set_len, move |x: &IpNet, set: &CidrValues| {
        array_op(x, set)
    })
}

/// `a in b`: at least one network of `b` contains `a`.
pub fn cidr_values_contains(
    a: &CidrEvaluator,
    b: &CidrValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    cidr_values_contains_with(a, b, opts, state, |x, set| set.contains(x))
}

/// `a allin b`: every network of `b` contains `a`.
pub fn all_cidr_values_contains(
    a: &CidrEvaluator,
    b: &CidrValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    cidr_values_contains_with(a, b, opts, state, |x, set| set.contains_all(x))
}

fn cidr_values_matches_with(
    a: &CidrValuesEvaluator,
    b: &CidrValuesEvaluator,
    opts: &Opts,
    state: &mut State,
    array_op: fn(&CidrValues, &CidrValues) -> bool,
) -> Result<BoolEvaluator> {
    let set_len = b.constant_value().map(CidrValues::len);
    lift(a, b, opts, state, set_len, move |xs: &CidrValues, ys: &CidrValues| {
        array_op(xs, ys)
    })
}

/// Weak match: at least one network of `a` is contained in some network of `b`.
pub fn cidr_values_matches(
    a: &CidrValuesEvaluator,
    b: &CidrValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    cidr_values_matches_with(a, b, opts, state, |xs, ys| {
        xs.ip_nets().iter().any(|x| ys.contains(x))
    })
}

/// Every network of `a` is contained in every network of `b`.
pub fn all_cidr_values_matches(
    a: &CidrValuesEvaluator,
    b: &CidrValuesEvaluator,
    opts: &Opts,
    state: &mut State,
) -> Result<BoolEvaluator> {
    cidr_values_matches_with(a, b, opts, state, |xs, ys| {
        xs.ip_nets().iter().all(|x| ys.contains_all(x))
    })
}

// =============================================================================
// Unary operators
// =============================================================================

fn map_unary<T, U>(a: &Evaluator<T>, state: &State, op: fn(&T) -> U) -> Evaluator<U>
where
    T: 'static,
    U: 'static,
{
    let is_dc = a.is_deterministic_for(state.field());
    let eval = match a.eval_kind() {
        Eval::Constant(v) => Eval::Constant(op(v)),
        Eval::Computed(ea) => {
            let ea = Arc::clone(ea);
            Eval::Computed(computation(move |ctx| op(&ea(ctx))))
        }
    };
    Evaluator::composed(eval, a.weight(), is_dc)
}

/// `^a`: bitwise complement.
pub fn int_not(a: &IntEvaluator, _opts: &Opts, state: &State) -> IntEvaluator {
    map_unary(a, state, |v| !*v)
}

/// `-a`
pub fn minus(a: &IntEvaluator, _opts: &Opts, state: &State) -> IntEvaluator {
    map_unary(a, state, |v| v.wrapping_neg())
}

/// `!a`
///
/// While a field is being specialized, negating an operand that is not
/// deterministic for it yields `true`: the operand's value is unknown, so
/// the rule might still match.
pub fn not(a: &BoolEvaluator, _opts: &Opts, state: &State) -> BoolEvaluator {
    let field = state.field();
    if field.is_some() && !a.is_constant() && !a.is_deterministic_for(field) {
        return BoolEvaluator::composed(
            Eval::Computed(computation(|_| true)),
            a.weight(),
            false,
        );
    }
    map_unary(a, state, |v| !*v)
}


// =============================================================================
// Property-based tests
// =============================================================================
