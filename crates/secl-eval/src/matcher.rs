//! String matchers compiled from literal operands.
//!
//! A literal compared against a field is turned into a [`StringMatcher`]
//! once, when the comparison is composed. At evaluation time `matches()`
//! runs against the event's value with no recompilation.

use regex::Regex;

use crate::error::{EvalError, Result};
use crate::opts::StringCmpOpts;
use crate::state::ValueType;

/// A pre-compiled matcher for one string literal.
#[derive(Debug, Clone)]
pub enum StringMatcher {
    /// Case-folded equality.
    ExactFold(String),

    /// Wildcard pattern, `*` matches any sequence.
    Pattern(Regex),

    /// Path glob. `normalize` rewrites `\` to `/` in the input first.
    Glob { regex: Regex, normalize: bool },

    /// User regex, unanchored.
    Regex(Regex),
}

impl StringMatcher {
    /// Compile a literal of the given value type.
    ///
    /// Returns `Ok(None)` for scalars compared case-sensitively: those use
    /// plain equality and need no matcher.
    pub fn compile(value: &str, value_type: ValueType, opts: StringCmpOpts) -> Result<Option<Self>> {
        let matcher = match value_type {
            ValueType::Pattern => {
                let re = Regex::new(&pattern_to_regex(value, opts.case_insensitive))?;
                StringMatcher::Pattern(re)
            }
            ValueType::Glob => {
                let re = Regex::new(&glob_to_regex(value, opts.case_insensitive)?)?;
                StringMatcher::Glob {
                    regex: re,
                    normalize: opts.path_separator_normalize,
                }
            }
            ValueType::Regexp => {
                let re = if opts.case_insensitive {
                    Regex::new(&format!("(?i){value}"))?
                } else {
                    Regex::new(value)?
                };
                StringMatcher::Regex(re)
            }
            ValueType::Scalar if opts.scalar_case_insensitive => {
                StringMatcher::ExactFold(value.to_string())
            }
            _ => return Ok(None),
        };
        log::debug!("compiled {value_type:?} literal {value:?} into {matcher:?}");
        Ok(Some(matcher))
    }

    /// Check whether a runtime value matches.
    pub fn matches(&self, s: &str) -> bool {
        match self {
            StringMatcher::ExactFold(expected) => eq_fold(s, expected),
            StringMatcher::Pattern(re) | StringMatcher::Regex(re) => re.is_match(s),
            StringMatcher::Glob { regex, normalize } => {
                if *normalize && s.contains('\\') {
                    regex.is_match(&s.replace('\\', "/"))
                } else {
                    regex.is_match(s)
                }
            }
        }
    }
}

/// Unicode case-folding equality, without allocating.
pub fn eq_fold(a: &str, b: &str) -> bool {
    a == b
        || a.chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
}

// ---------------------------------------------------------------------------
// Wildcard translation
// ---------------------------------------------------------------------------

/// Convert a wildcard pattern to an anchored regex.
///
/// `*` becomes `.*`; everything else is matched literally.
pub fn pattern_to_regex(pattern: &str, case_insensitive: bool) -> String {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str(if case_insensitive { "(?is)^" } else { "(?s)^" });
    for (i, part) in pattern.split('*').enumerate() {
        if i > 0 {
            re.push_str(".*");
        }
        re.push_str(&regex::escape(part));
    }
    re.push('$');
    re
}

/// Convert a path glob to an anchored regex.
///
/// `**` crosses path separators, `*` and `?` do not, and `[...]` classes are
/// kept (`[!...]` negates). An unterminated class is an error.
pub fn glob_to_regex(glob: &str, case_insensitive: bool) -> Result<String> {
    let mut re = String::with_capacity(glob.len() + 8);
    if case_insensitive {
        re.push_str("(?i)");
    }
    re.push('^');

    let mut chars = glob.chars().peekable();
    let mut literal = String::new();
    while let Some(c) = chars.next() {
        match c {
            '*' | '?' | '[' => {
                re.push_str(&regex::escape(&literal));
                literal.clear();
            }
            _ => {
                literal.push(c);
                continue;
            }
        }
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                re.push_str(".*");
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            _ => {
                let mut class = String::from("[");
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                for cc in chars.by_ref() {
                    if cc == ']' {
                        closed = true;
                        break;
                    }
                    if matches!(cc, '\\' | '[' | '&' | '~') {
                        class.push('\\');
                    }
                    class.push(cc);
                }
                if !closed {
                    return Err(EvalError::InvalidPattern {
                        pattern: glob.to_string(),
                        reason: "unterminated character class".to_string(),
                    });
                }
                class.push(']');
                re.push_str(&class);
            }
        }
    }
    re.push_str(&regex::escape(&literal));
    re.push('$');
    Ok(re)
}
