//! Compile-time state.
//!
//! A [`State`] is threaded through every operator call while one rule is
//! compiled. It records the field currently being specialized for partial
//! evaluation and every literal value a field was compared against, which a
//! rule engine later turns into per-field indexes.
//!
//! A `State` is only touched by the single compiling thread and should be
//! dropped (or consumed with [`State::into_field_values`]) once compilation
//! ends. Compiled evaluators never reference it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use ipnet::IpNet;
use serde::Serialize;

use crate::error::{EvalError, Result};

/// How a registered literal is meant to be matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    /// Plain value, compared for equality.
    #[default]
    Scalar,
    /// Wildcard pattern where `*` matches any sequence.
    Pattern,
    /// Path glob where `*` stops at `/` and `**` crosses it.
    Glob,
    /// Regular expression.
    Regexp,
    /// Bound of an ordered integer comparison.
    Range,
    /// IP address or network.
    IpNet,
}

/// A literal value as registered for a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Int(i64),
    Bool(bool),
    IpNet(IpNet),
}

impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        LiteralValue::String(s)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}

impl From<i64> for LiteralValue {
    fn from(n: i64) -> Self {
        LiteralValue::Int(n)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Bool(b)
    }
}

impl From<IpNet> for LiteralValue {
    fn from(net: IpNet) -> Self {
        LiteralValue::IpNet(net)
    }
}

/// Semantic kind of a literal, used to detect incompatible registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldValueKind {
    String,
    Int,
    Bool,
    IpNet,
}

impl fmt::Display for FieldValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldValueKind::String => "string",
            FieldValueKind::Int => "integer",
            FieldValueKind::Bool => "boolean",
            FieldValueKind::IpNet => "IP network",
        };
        f.write_str(name)
    }
}

/// One concrete value a field was compared against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldValue {
    pub value: LiteralValue,
    pub value_type: ValueType,
    /// Compiled network for IP values.
    #[serde(skip)]
    pub ip_matcher: Option<IpNet>,
}

impl FieldValue {
    pub fn new(value: impl Into<LiteralValue>, value_type: ValueType) -> Self {
        FieldValue {
            value: value.into(),
            value_type,
            ip_matcher: None,
        }
    }

    /// A plain value compared for equality.
    pub fn scalar(value: impl Into<LiteralValue>) -> Self {
        Self::new(value, ValueType::Scalar)
    }

    /// An IP network, carrying its matcher.
    pub fn ip_net(net: IpNet) -> Self {
        FieldValue {
            value: LiteralValue::IpNet(net),
            value_type: ValueType::IpNet,
            ip_matcher: Some(net),
        }
    }

    pub fn kind(&self) -> FieldValueKind {
        match self.value {
            LiteralValue::String(_) => FieldValueKind::String,
            LiteralValue::Int(_) => FieldValueKind::Int,
            LiteralValue::Bool(_) => FieldValueKind::Bool,
            LiteralValue::IpNet(_) => FieldValueKind::IpNet,
        }
    }
}

/// Values that contribute [`FieldValue`]s when compared against a field.
pub trait IntoFieldValues {
    /// The field values this literal registers, given the literal's value type.
    fn field_values(&self, value_type: ValueType) -> Vec<FieldValue>;
}

impl IntoFieldValues for String {
    fn field_values(&self, value_type: ValueType) -> Vec<FieldValue> {
        vec![FieldValue::new(self.as_str(), value_type)]
    }
}

impl IntoFieldValues for i64 {
    fn field_values(&self, value_type: ValueType) -> Vec<FieldValue> {
        vec![FieldValue::new(*self, value_type)]
    }
}

impl IntoFieldValues for bool {
    fn field_values(&self, _value_type: ValueType) -> Vec<FieldValue> {
        vec![FieldValue::scalar(*self)]
    }
}

impl IntoFieldValues for IpNet {
    fn field_values(&self, _value_type: ValueType) -> Vec<FieldValue> {
        vec![FieldValue::ip_net(*self)]
    }
}

impl<T: IntoFieldValues> IntoFieldValues for Vec<T> {
    fn field_values(&self, value_type: ValueType) -> Vec<FieldValue> {
        self.iter()
            .flat_map(|v| v.field_values(value_type))
            .collect()
    }
}

// =============================================================================
// State
// =============================================================================

/// Mutable compile-time state for one rule.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Field being specialized for partial evaluation, if any.
    field: Option<String>,
    /// Literal values each field was compared against, in registration order.
    field_values: HashMap<String, Vec<FieldValue>>,
    /// Index of `field_values` for duplicate checks.
    seen: HashMap<String, HashSet<FieldValue>>,
}

impl State {
    /// State for a full (non-specialized) compilation.
    pub fn new() -> Self {
        Self::default()
    }

    /// State specializing the compilation for `field`.
    pub fn for_field(field: impl Into<String>) -> Self {
        State {
            field: Some(field.into()),
            ..Default::default()
        }
    }

    /// The field currently being specialized for.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Record that `field` is compared against `value`.
    ///
    /// Identical registrations are ignored. Registering a value whose kind
    /// differs from the values already recorded for the field fails with
    /// [`EvalError::FieldTypeConflict`].
    pub fn update_field_values(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let values = self.field_values.entry(field.to_string()).or_default();

        if let Some(existing) = values.first()
            && existing.kind() != value.kind()
        {
            return Err(EvalError::FieldTypeConflict {
                field: field.to_string(),
                existing: existing.kind(),
                incoming: value.kind(),
            });
        }

        if !self
            .seen
            .entry(field.to_string())
            .or_default()
            .insert(value.clone())
        {
            log::trace!("field value already registered for {field}: {:?}", value.value);
            return Ok(());
        }

        log::debug!(
            "registering {:?} value {:?} for field {field}",
            value.value_type,
            value.value
        );
        values.push(value);
        Ok(())
    }

    /// Values registered for `field`.
    pub fn field_values(&self, field: &str) -> &[FieldValue] {
        self.field_values
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Names of every field with at least one registered value.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.field_values.keys().map(String::as_str)
    }

    /// Consume the state, keeping only the accumulated field values.
    pub fn into_field_values(self) -> HashMap<String, Vec<FieldValue>> {
        self.field_values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_dedup() {
        let mut state = State::new();
        state
            .update_field_values("process.name", FieldValue::scalar("bash"))
            .unwrap();
        state
            .update_field_values("process.name", FieldValue::scalar("bash"))
            .unwrap();
        state
            .update_field_values("process.name", FieldValue::new("z*", ValueType::Pattern))
            .unwrap();
        assert_eq!(state.field_values("process.name").len(), 2);
        assert!(state.field_values("process.pid").is_empty());
    }

    #[test]
    fn test_large_set_dedup_keeps_order() {
        let mut state = State::new();
        for round in 0..2 {
            for port in 0..2000i64 {
                state
                    .update_field_values("network.port", FieldValue::scalar(port))
                    .unwrap();
            }
            assert_eq!(state.field_values("network.port").len(), 2000, "round {round}");
        }
        assert_eq!(state.field_values("network.port")[7], FieldValue::scalar(7));
        // Same value under another type is a distinct entry.
        state
            .update_field_values("network.port", FieldValue::new(7, ValueType::Range))
            .unwrap();
        assert_eq!(state.field_values("network.port").len(), 2001);
    }

    #[test]
    fn test_string_value_types_are_compatible() {
        let mut state = State::new();
        state
            .update_field_values("f", FieldValue::new("/usr/*", ValueType::Glob))
            .unwrap();
        state
            .update_field_values("f", FieldValue::new("^a", ValueType::Regexp))
            .unwrap();
        assert_eq!(state.field_values("f").len(), 2);
    }

    #[test]
    fn test_type_conflict() {
        let mut state = State::new();
        state
            .update_field_values("process.pid", FieldValue::scalar(1))
            .unwrap();
        let err = state
            .update_field_values("process.pid", FieldValue::scalar("one"))
            .unwrap_err();
        match err {
            EvalError::FieldTypeConflict {
                field,
                existing,
                incoming,
            } => {
                assert_eq!(field, "process.pid");
                assert_eq!(existing, FieldValueKind::Int);
                assert_eq!(incoming, FieldValueKind::String);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Conflicting value is not recorded.
        assert_eq!(state.field_values("process.pid").len(), 1);
    }

    #[test]
    fn test_for_field() {
        let state = State::for_field("open.file.path");
        assert_eq!(state.field(), Some("open.file.path"));
        assert_eq!(State::new().field(), None);
    }

    #[test]
    fn test_ip_net_field_value_carries_matcher() {
        let net: IpNet = "10.0.0.0/8".parse().unwrap();
        let fv = FieldValue::ip_net(net);
        assert_eq!(fv.value_type, ValueType::IpNet);
        assert_eq!(fv.ip_matcher, Some(net));
        assert_eq!(fv.kind(), FieldValueKind::IpNet);
    }
}
