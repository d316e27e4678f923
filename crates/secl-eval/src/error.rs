//! Compile-time error types.
//!
//! Every error in this crate is raised while a rule is being compiled into an
//! evaluator tree. A compiled tree never fails during event evaluation.

use thiserror::Error;

use crate::state::FieldValueKind;

/// Errors that can occur while composing evaluators.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A regex literal failed to compile.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A glob or wildcard pattern literal is malformed.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A CIDR or IP literal failed to parse.
    #[error("invalid CIDR: {0}")]
    InvalidCidr(#[from] ipnet::AddrParseError),

    /// A field was compared against values of incompatible kinds within one rule.
    #[error("field '{field}' compared against both {existing} and {incoming} values")]
    FieldTypeConflict {
        field: String,
        existing: FieldValueKind,
        incoming: FieldValueKind,
    },
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EvalError>;
