//! Multi-pattern string sets.
//!
//! A [`StringValues`] collects the literal members of a set such as
//! `["bash", ~"/usr/bin/*", r"sh$"]`. The set itself is plain data; each
//! comparison that uses it compiles it with its own options into a
//! [`CompiledStringValues`], so the same literal can back comparisons with
//! different case policies.

use std::collections::HashSet;

use crate::error::Result;
use crate::matcher::{StringMatcher, eq_fold};
use crate::opts::StringCmpOpts;
use crate::state::{FieldValue, IntoFieldValues, LiteralValue, ValueType};

/// A set of string literals of mixed value types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringValues {
    field_values: Vec<FieldValue>,
}

impl StringValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set of plain values.
    pub fn from_scalars<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let mut set = StringValues::new();
        for value in values {
            set.append_scalar(value);
        }
        set
    }

    pub fn append_scalar(&mut self, value: impl Into<String>) {
        self.append(value, ValueType::Scalar);
    }

    /// Add a member of the given value type.
    pub fn append(&mut self, value: impl Into<String>, value_type: ValueType) {
        let value: String = value.into();
        self.field_values.push(FieldValue::new(value, value_type));
    }

    /// Compile every member with `opts`.
    pub fn compile(&self, opts: StringCmpOpts) -> Result<CompiledStringValues> {
        let mut scalars = HashSet::new();
        let mut matchers = Vec::new();
        for (value, value_type) in self.strings() {
            if value_type == ValueType::Scalar {
                scalars.insert(value.to_string());
            } else if let Some(m) = StringMatcher::compile(value, value_type, opts)? {
                matchers.push(m);
            }
        }
        log::debug!(
            "compiled string set: {} scalars, {} matchers",
            scalars.len(),
            matchers.len()
        );

        Ok(CompiledStringValues {
            scalars,
            fold_scalars: opts.scalar_case_insensitive,
            matchers,
        })
    }

    /// Whether `value` equals a plain member, folding case if asked.
    ///
    /// Pattern members are ignored; use [`StringValues::compile`] for those.
    pub fn matches_scalar(&self, value: &str, fold: bool) -> bool {
        self.strings().any(|(s, value_type)| {
            value_type == ValueType::Scalar && if fold { eq_fold(s, value) } else { s == value }
        })
    }

    pub fn field_values(&self) -> &[FieldValue] {
        &self.field_values
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }

    fn strings(&self) -> impl Iterator<Item = (&str, ValueType)> {
        self.field_values.iter().filter_map(|fv| match &fv.value {
            LiteralValue::String(s) => Some((s.as_str(), fv.value_type)),
            _ => None,
        })
    }
}

impl IntoFieldValues for StringValues {
    fn field_values(&self, _value_type: ValueType) -> Vec<FieldValue> {
        self.field_values.clone()
    }
}

/// A [`StringValues`] compiled for one comparison.
#[derive(Debug, Clone)]
pub struct CompiledStringValues {
    scalars: HashSet<String>,
    fold_scalars: bool,
    matchers: Vec<StringMatcher>,
}

impl CompiledStringValues {
    /// Whether `value` matches any member.
    pub fn matches(&self, value: &str) -> bool {
        let scalar_hit = if self.fold_scalars {
            self.scalars.iter().any(|s| eq_fold(s, value))
        } else {
            self.scalars.contains(value)
        };
        scalar_hit || self.matchers.iter().any(|m| m.matches(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    fn mixed() -> StringValues {
        let mut set = StringValues::new();
        set.append_scalar("bash");
        set.append("/usr/bin/*", ValueType::Pattern);
        set.append("^/opt/.*sh$", ValueType::Regexp);
        set
    }

    fn fold() -> StringCmpOpts {
        StringCmpOpts {
            scalar_case_insensitive: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_and_match() {
        let compiled = mixed().compile(StringCmpOpts::default()).unwrap();
        assert!(compiled.matches("bash"));
        assert!(compiled.matches("/usr/bin/cat"));
        assert!(compiled.matches("/opt/zsh"));
        assert!(!compiled.matches("/etc/passwd"));
        assert!(!compiled.matches("BASH"));
    }

    #[test]
    fn test_each_compile_uses_its_own_options() {
        let set = mixed();
        let plain = set.compile(StringCmpOpts::default()).unwrap();
        let folded = set.compile(fold()).unwrap();
        assert!(!plain.matches("BASH"));
        assert!(folded.matches("BASH"));
    }

    #[test]
    fn test_from_scalars_honours_fold() {
        let set = StringValues::from_scalars(["a", "b"]);
        assert_eq!(set.len(), 2);
        assert!(!set.compile(StringCmpOpts::default()).unwrap().matches("B"));
        assert!(set.compile(fold()).unwrap().matches("B"));
    }

    #[test]
    fn test_matches_scalar_skips_patterns() {
        let set = mixed();
        assert!(set.matches_scalar("bash", false));
        assert!(!set.matches_scalar("BASH", false));
        assert!(set.matches_scalar("BASH", true));
        assert!(!set.matches_scalar("/usr/bin/cat", true));
    }

    #[test]
    fn test_invalid_member_fails_compile() {
        let mut set = StringValues::new();
        set.append("(", ValueType::Regexp);
        let err = set.compile(StringCmpOpts::default()).unwrap_err();
        assert!(matches!(err, EvalError::InvalidRegex(_)));
    }
}
