//! # secl-eval
//!
//! Expression evaluation core for security rule expressions.
//!
//! A rule compiler builds leaves (literals and event field reads) and composes
//! them with the operators of this crate into a boolean tree that is then
//! evaluated against each event.
//!
//! ## Architecture
//!
//! - **Evaluators**: every node is either a constant folded at compile time
//!   or a computation over the event [`Context`]. Literals compared against
//!   fields are compiled into matchers once, at composition time.
//! - **State**: while composing, each literal compared against a named field
//!   is recorded in [`State`], so a rule engine can index rules by the values
//!   their fields are compared against.
//! - **Determinism**: when compiling with [`State::for_field`], each node
//!   records whether its result depends only on that field, enabling
//!   [`partial_eval`].
//!
//! ## Quick Start
//!
//! ```rust
//! use secl_eval::{Context, Opts, State, StringEvaluator, operators};
//! use serde_json::json;
//!
//! let mut state = State::new();
//! let path = StringEvaluator::field_read("process.file.path");
//! let rule = operators::string_equals(
//!     &path,
//!     &StringEvaluator::glob("/usr/bin/*"),
//!     &Opts::default(),
//!     &mut state,
//! )
//! .unwrap();
//!
//! let event = json!({"process": {"file": {"path": "/usr/bin/cat"}}});
//! assert!(rule.eval(&Context::from_value(&event)));
//! assert_eq!(state.field_values("process.file.path").len(), 1);
//! ```
//!
//! ## Partial Evaluation
//!
//! ```rust
//! use secl_eval::{
//!     Context, IntEvaluator, Opts, State, StringEvaluator, field_value_context, operators,
//!     partial_eval,
//! };
//!
//! let mut state = State::for_field("process.name");
//! let rule = operators::string_equals(
//!     &StringEvaluator::field_read("process.name"),
//!     &StringEvaluator::constant("sshd".into()),
//!     &Opts::default(),
//!     &mut state,
//! )
//! .unwrap();
//!
//! for value in state.field_values("process.name") {
//!     let event = field_value_context("process.name", value).unwrap();
//!     assert!(partial_eval(&rule, "process.name", &Context::from_value(&event)));
//! }
//!
//! // A rule on another field cannot be ruled out by the process name.
//! let other = operators::int_equals(
//!     &IntEvaluator::field_read("process.pid"),
//!     &IntEvaluator::constant(1),
//!     &Opts::default(),
//!     &mut state,
//! )
//! .unwrap();
//! let event = serde_json::json!({"process.name": "bash"});
//! assert!(partial_eval(&other, "process.name", &Context::from_value(&event)));
//! ```

pub mod cidr;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod operators;
pub mod opts;
pub mod overrides;
pub mod partial;
pub mod state;
pub mod values;

// Re-export the most commonly used types and functions at crate root
pub use cidr::{CidrValues, ip_nets_match, parse_ip_net};
pub use context::{Context, FromContext};
pub use error::{EvalError, Result};
pub use evaluator::{
    BoolArrayEvaluator, BoolEvaluator, CidrEvaluator, CidrValuesEvaluator, Eval, EvalFn,
    Evaluator, FUNCTION_WEIGHT, HANDLER_WEIGHT, IN_ARRAY_WEIGHT, IntArrayEvaluator,
    IntEvaluator, StringArrayEvaluator, StringEvaluator, StringValuesEvaluator, computation,
};
pub use matcher::StringMatcher;
pub use opts::{Opts, StringCmpOpts};
pub use overrides::OpOverrides;
pub use partial::{field_value_context, partial_eval};
pub use state::{FieldValue, FieldValueKind, IntoFieldValues, LiteralValue, State, ValueType};
pub use values::{CompiledStringValues, StringValues};
