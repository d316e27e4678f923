//! Compile options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::evaluator::IN_ARRAY_WEIGHT;
use crate::overrides::OpOverrides;

/// Per-operand string comparison options.
///
/// Deserializable so rule engines can load per-field comparison policy from
/// their own configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringCmpOpts {
    /// Pattern, glob and regex literals ignore case.
    pub case_insensitive: bool,
    /// Plain `==` / `in` comparisons ignore case.
    pub scalar_case_insensitive: bool,
    /// Treat `\` as `/` when matching globs.
    pub path_separator_normalize: bool,
}

impl StringCmpOpts {
    /// Options requested by either side of a comparison.
    pub fn union(self, other: StringCmpOpts) -> StringCmpOpts {
        StringCmpOpts {
            case_insensitive: self.case_insensitive || other.case_insensitive,
            scalar_case_insensitive: self.scalar_case_insensitive || other.scalar_case_insensitive,
            path_separator_normalize: self.path_separator_normalize
                || other.path_separator_normalize,
        }
    }
}

/// Options shared by every operator call of one compilation.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Operator replacements, keyed by the field they apply to.
    pub overrides: HashMap<String, OpOverrides>,
    /// Cost of one element of a literal set in containment weights.
    pub in_array_weight: usize,
}

impl Opts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register operator overrides for a field.
    pub fn with_overrides(mut self, field: impl Into<String>, overrides: OpOverrides) -> Self {
        self.overrides.insert(field.into(), overrides);
        self
    }

    /// Overrides for the first of `fields` that has any.
    pub fn overrides_for<'a>(&self, fields: impl IntoIterator<Item = Option<&'a str>>) -> Option<&OpOverrides> {
        fields
            .into_iter()
            .flatten()
            .find_map(|field| self.overrides.get(field))
    }
}

impl Default for Opts {
    fn default() -> Self {
        Opts {
            overrides: HashMap::new(),
            in_array_weight: IN_ARRAY_WEIGHT,
        }
    }
}
