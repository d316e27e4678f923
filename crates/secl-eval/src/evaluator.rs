//! Typed evaluator nodes.
//!
//! An [`Evaluator<T>`] is one node of a compiled rule: either a constant
//! known at compile time or a computation run against each event's
//! [`Context`]. The variant is fixed at construction and every attribute of
//! a node is frozen once built, so a compiled tree can be evaluated from
//! many threads at once without locking.

use std::fmt;
use std::sync::Arc;

use ipnet::IpNet;

use crate::cidr::{CidrValues, parse_ip_net};
use crate::context::{Context, FromContext};
use crate::error::Result;
use crate::matcher::StringMatcher;
use crate::opts::StringCmpOpts;
use crate::state::ValueType;
use crate::values::StringValues;

/// Cost of a field accessor or helper function.
pub const FUNCTION_WEIGHT: usize = 5;
/// Cost of a field resolved through an external handler.
pub const HANDLER_WEIGHT: usize = 50;
/// Cost of one element of a set scanned by a containment test.
pub const IN_ARRAY_WEIGHT: usize = 10;

/// A per-event computation.
pub type EvalFn<T> = Arc<dyn for<'c> Fn(&Context<'c>) -> T + Send + Sync>;

/// Either a constant or a per-event computation, never both.
#[derive(Clone)]
pub enum Eval<T> {
    Constant(T),
    Computed(EvalFn<T>),
}

impl<T: fmt::Debug> fmt::Debug for Eval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eval::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Eval::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Wrap a closure as a computation.
///
/// Going through this function lets the closure's signature be inferred as
/// generic over the context lifetime.
pub fn computation<T, F>(f: F) -> EvalFn<T>
where
    F: Fn(&Context<'_>) -> T + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A compiled node yielding a `T`.
#[derive(Debug, Clone)]
pub struct Evaluator<T> {
    eval: Eval<T>,
    /// Set iff this node directly reads a named event field.
    field: Option<String>,
    weight: usize,
    string_cmp: StringCmpOpts,
    value_type: ValueType,
    is_deterministic: bool,
}

pub type BoolEvaluator = Evaluator<bool>;
pub type IntEvaluator = Evaluator<i64>;
pub type StringEvaluator = Evaluator<String>;
pub type StringArrayEvaluator = Evaluator<Vec<String>>;
pub type IntArrayEvaluator = Evaluator<Vec<i64>>;
pub type BoolArrayEvaluator = Evaluator<Vec<bool>>;
pub type CidrEvaluator = Evaluator<IpNet>;
pub type CidrValuesEvaluator = Evaluator<CidrValues>;
pub type StringValuesEvaluator = Evaluator<StringValues>;

impl<T> Evaluator<T> {
    fn with_eval(eval: Eval<T>) -> Self {
        Evaluator {
            eval,
            field: None,
            weight: 0,
            string_cmp: StringCmpOpts::default(),
            value_type: ValueType::Scalar,
            is_deterministic: false,
        }
    }

    /// A literal.
    pub fn constant(value: T) -> Self {
        Self::with_eval(Eval::Constant(value))
    }

    /// A compound computation that reads no single named field.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> T + Send + Sync + 'static,
    {
        Self::with_eval(Eval::Computed(computation(f)))
    }

    /// A read of the named field through a custom accessor.
    pub fn field_with<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> T + Send + Sync + 'static,
    {
        Evaluator {
            field: Some(name.into()),
            weight: FUNCTION_WEIGHT,
            ..Self::computed(f)
        }
    }

    /// A read of the named field resolved through an external handler, such
    /// as a lookup the event source performs on demand.
    pub fn handler_field<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> T + Send + Sync + 'static,
    {
        Self::field_with(name, f).with_weight(HANDLER_WEIGHT)
    }

    /// Composition result. Only operators build these.
    pub(crate) fn composed(eval: Eval<T>, weight: usize, is_deterministic: bool) -> Self {
        Evaluator {
            weight,
            is_deterministic,
            ..Self::with_eval(eval)
        }
    }

    pub fn with_weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_string_cmp_opts(mut self, opts: StringCmpOpts) -> Self {
        self.string_cmp = opts;
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Mark the node as stable across events regardless of the field being
    /// specialized.
    pub fn with_deterministic(mut self, is_deterministic: bool) -> Self {
        self.is_deterministic = is_deterministic;
        self
    }

    pub fn eval_kind(&self) -> &Eval<T> {
        &self.eval
    }

    pub fn constant_value(&self) -> Option<&T> {
        match &self.eval {
            Eval::Constant(v) => Some(v),
            Eval::Computed(_) => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.eval, Eval::Constant(_))
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn weight(&self) -> usize {
        self.weight
    }

    pub fn string_cmp_opts(&self) -> StringCmpOpts {
        self.string_cmp
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether this node's result is fixed once `field`'s value is fixed.
    ///
    /// A direct read of `field` always is; anything else relies on the flag
    /// computed when the node was composed.
    pub fn is_deterministic_for(&self, field: Option<&str>) -> bool {
        self.is_deterministic || (self.field.is_some() && self.field.as_deref() == field)
    }
}

impl<T: Clone> Evaluator<T> {
    /// Evaluate the node against one event.
    pub fn eval(&self, ctx: &Context<'_>) -> T {
        match &self.eval {
            Eval::Constant(v) => v.clone(),
            Eval::Computed(f) => f(ctx),
        }
    }
}

impl<T: FromContext + 'static> Evaluator<T> {
    /// A typed read of the named event field.
    pub fn field_read(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        Self::field_with(name, move |ctx| ctx.read::<T>(&key))
    }
}

// =============================================================================
// Literal helpers
// =============================================================================

impl Evaluator<String> {
    /// A wildcard pattern literal (`*` matches anything).
    pub fn pattern(value: impl Into<String>) -> Self {
        Self::constant(value.into()).with_value_type(ValueType::Pattern)
    }

    /// A path glob literal.
    pub fn glob(value: impl Into<String>) -> Self {
        Self::constant(value.into()).with_value_type(ValueType::Glob)
    }

    /// A regular expression literal.
    pub fn regex(value: impl Into<String>) -> Self {
        Self::constant(value.into()).with_value_type(ValueType::Regexp)
    }

    /// Compile this literal into a matcher.
    ///
    /// Computed nodes and case-sensitive scalars yield `None`; the caller
    /// then falls back to plain equality.
    pub fn to_string_matcher(&self, opts: StringCmpOpts) -> Result<Option<StringMatcher>> {
        match &self.eval {
            Eval::Constant(value) => {
                StringMatcher::compile(value, self.value_type, opts.union(self.string_cmp))
            }
            Eval::Computed(_) => Ok(None),
        }
    }
}

impl Evaluator<IpNet> {
    /// A CIDR or IP address literal.
    pub fn cidr(value: &str) -> Result<Self> {
        Ok(Self::constant(parse_ip_net(value)?).with_value_type(ValueType::IpNet))
    }
}

impl Evaluator<CidrValues> {
    /// A literal set of CIDRs or addresses.
    pub fn cidrs<'s>(values: impl IntoIterator<Item = &'s str>) -> Result<Self> {
        Ok(Self::constant(CidrValues::from_strs(values)?).with_value_type(ValueType::IpNet))
    }
}
