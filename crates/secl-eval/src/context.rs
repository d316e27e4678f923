//! Per-event data access.
//!
//! A [`Context`] is a thin, read-only wrapper around the JSON event being
//! evaluated. Field reads support dot notation (e.g., `process.file.path`)
//! with flat-key precedence, and typed reads through [`FromContext`] are
//! total: a missing or mistyped field reads as the type's empty value.

use std::net::{IpAddr, Ipv4Addr};

use ipnet::IpNet;
use serde_json::Value;

use crate::cidr::{CidrValues, parse_ip_net};
use crate::values::StringValues;

/// A reference to one event, handed to every computed evaluator.
///
/// Flat keys are checked first: `"process.file.path"` as a single key takes
/// precedence over `{"process": {"file": {"path": ...}}}` nested traversal.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    inner: &'a Value,
}

impl<'a> Context<'a> {
    /// Wrap a JSON value as an evaluation context.
    pub fn from_value(value: &'a Value) -> Self {
        Context { inner: value }
    }

    /// Look a field up by name.
    ///
    /// The whole name is tried as one key first, then as a dotted path. A
    /// path step landing on an array continues into each element in turn.
    pub fn get_field(&self, name: &str) -> Option<&'a Value> {
        self.inner
            .as_object()
            .and_then(|obj| obj.get(name))
            .or_else(|| lookup_path(self.inner, name))
    }

    /// Typed read of a field. Never fails.
    pub fn read<T: FromContext>(&self, field: &str) -> T {
        T::from_context(self, field)
    }

    /// Access the underlying JSON value.
    pub fn as_value(&self) -> &'a Value {
        self.inner
    }
}

fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    match value {
        Value::Array(items) => items.iter().find_map(|item| lookup_path(item, path)),
        Value::Object(map) => match path.split_once('.') {
            Some((key, rest)) => lookup_path(map.get(key)?, rest),
            None => map.get(path),
        },
        _ => None,
    }
}

// =============================================================================
// Typed reads
// =============================================================================

/// Types that can be read from a [`Context`] field.
///
/// Implementations must be total so that evaluation stays infallible.
pub trait FromContext: Sized {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self;
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn value_to_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn value_to_ip(v: &Value) -> Option<IpNet> {
    v.as_str().and_then(|s| parse_ip_net(s).ok())
}

/// Collect a field as a list: arrays element-wise, scalars as one element.
fn read_list<T>(ctx: &Context<'_>, field: &str, conv: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    match ctx.get_field(field) {
        Some(Value::Array(arr)) => arr.iter().filter_map(conv).collect(),
        Some(v) => conv(v).into_iter().collect(),
        None => Vec::new(),
    }
}

impl FromContext for String {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        ctx.get_field(field)
            .and_then(value_to_string)
            .unwrap_or_default()
    }
}

impl FromContext for i64 {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        ctx.get_field(field).and_then(value_to_int).unwrap_or_default()
    }
}

impl FromContext for bool {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        ctx.get_field(field).and_then(value_to_bool).unwrap_or_default()
    }
}

impl FromContext for Vec<String> {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        read_list(ctx, field, value_to_string)
    }
}

impl FromContext for Vec<i64> {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        read_list(ctx, field, value_to_int)
    }
}

impl FromContext for Vec<bool> {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        read_list(ctx, field, value_to_bool)
    }
}

impl FromContext for IpNet {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        ctx.get_field(field)
            .and_then(value_to_ip)
            .unwrap_or_else(|| IpNet::from(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
    }
}

impl FromContext for CidrValues {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        let mut values = CidrValues::default();
        for net in read_list(ctx, field, value_to_ip) {
            values.append_ip_net(net);
        }
        values
    }
}

impl FromContext for StringValues {
    fn from_context(ctx: &Context<'_>, field: &str) -> Self {
        StringValues::from_scalars(read_list(ctx, field, value_to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_field() {
        let v = json!({"process.file.path": "/usr/bin/cat"});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<String>("process.file.path"), "/usr/bin/cat");
    }

    #[test]
    fn test_nested_field() {
        let v = json!({"process": {"file": {"path": "/bin/ls"}}});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<String>("process.file.path"), "/bin/ls");
    }

    #[test]
    fn test_flat_key_precedence() {
        let v = json!({"process.pid": 1, "process": {"pid": 2}});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<i64>("process.pid"), 1);
    }

    #[test]
    fn test_missing_fields_read_empty() {
        let v = json!({});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<String>("a"), "");
        assert_eq!(ctx.read::<i64>("a"), 0);
        assert!(!ctx.read::<bool>("a"));
        assert!(ctx.read::<Vec<String>>("a").is_empty());
        assert_eq!(ctx.read::<IpNet>("a").to_string(), "0.0.0.0/32");
    }

    #[test]
    fn test_scalar_read_as_list() {
        let v = json!({"args": "-l", "ids": [1, "2", "x"]});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<Vec<String>>("args"), vec!["-l".to_string()]);
        assert_eq!(ctx.read::<Vec<i64>>("ids"), vec![1, 2]);
    }

    #[test]
    fn test_ip_read() {
        let v = json!({"dst": "10.1.2.3", "net": "192.168.0.0/16"});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<IpNet>("dst").to_string(), "10.1.2.3/32");
        assert_eq!(ctx.read::<IpNet>("net").to_string(), "192.168.0.0/16");
    }

    #[test]
    fn test_array_traversal() {
        let v = json!({"a": {"b": [{"c": "found"}, {"c": "other"}]}});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<String>("a.b.c"), "found");
    }

    #[test]
    fn test_array_traversal_skips_elements_without_key() {
        let v = json!({"a": [{"x": 1}, {"b": "second"}]});
        let ctx = Context::from_value(&v);
        assert_eq!(ctx.read::<String>("a.b"), "second");
        assert_eq!(ctx.get_field("a.z"), None);
    }
}
