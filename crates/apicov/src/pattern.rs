//! Path template compilation.
//!
//! Turns a contract path template such as `/users/{id}/orders` into an
//! anchored regular expression:
//!
//! | Token                     | Compiles to | Matches                          |
//! |---------------------------|-------------|----------------------------------|
//! | `{name}`                  | `[^/]+`     | exactly one path segment         |
//! | `{any+}` followed by `/`  | `[^/]+`     | one segment, `/` stays literal   |
//! | `{any+}` otherwise        | `.+`        | the remainder of the path        |
//! | `/{catchall+}` (whole)    | `/catchall` | the fixed fallback path only     |
//!
//! Everything else is matched literally and the result is anchored with
//! `^...$`, so a template never matches a prefix or suffix of a path.

use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Template that is replaced wholesale by [`CATCHALL_FALLBACK`]
pub const CATCHALL_TEMPLATE: &str = "/{catchall+}";

/// Path matched by the [`CATCHALL_TEMPLATE`] shortcut
pub const CATCHALL_FALLBACK: &str = "/catchall";

/// Greedy parameter name
const GREEDY_PARAM: &str = "any+";

const SEGMENT: &str = "[^/]+";
const REMAINDER: &str = ".+";

/// Template compilation failure, always naming the offending template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A `{` without its `}`, a stray `}`, or nested braces
    #[error("Malformed template {template:?}: unbalanced braces")]
    UnbalancedBraces {
        /// Raw template
        template: String,
    },

    /// `{}` with no parameter name
    #[error("Malformed template {template:?}: empty parameter at byte {offset}")]
    EmptyParameter {
        /// Raw template
        template: String,
        /// Byte offset of the opening brace
        offset: usize,
    },

    /// The generated expression was rejected by the regex engine
    #[error("Template {template:?} compiled to an invalid expression: {message}")]
    InvalidExpression {
        /// Raw template
        template: String,
        /// Regex engine message
        message: String,
    },
}

impl PatternError {
    /// Template that failed to compile
    #[must_use]
    pub fn template(&self) -> &str {
        match self {
            Self::UnbalancedBraces { template }
            | Self::EmptyParameter { template, .. }
            | Self::InvalidExpression { template, .. } => template,
        }
    }
}

/// A compiled path template
///
/// Two patterns are equal when their raw templates are equal, regardless of
/// the generated expression.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a template, see [`compile`]
    pub fn new(template: &str) -> Result<Self, PatternError> {
        compile(template)
    }

    /// Raw template this pattern was compiled from
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Generated expression
    #[must_use]
    pub fn as_regex_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the whole of `path` matches the template
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

impl Eq for PathPattern {}

impl Hash for PathPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.template.hash(state);
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Compile a contract path template into an anchored matcher
pub fn compile(template: &str) -> Result<PathPattern, PatternError> {
    let source = if template == CATCHALL_TEMPLATE {
        format!("^{}$", regex::escape(CATCHALL_FALLBACK))
    } else {
        translate(template)?
    };

    let regex = Regex::new(&source).map_err(|e| PatternError::InvalidExpression {
        template: template.to_string(),
        message: e.to_string(),
    })?;

    Ok(PathPattern {
        template: template.to_string(),
        regex,
    })
}

/// Left-to-right rewrite of a template into regex source
fn translate(template: &str) -> Result<String, PatternError> {
    let unbalanced = || PatternError::UnbalancedBraces {
        template: template.to_string(),
    };

    let mut source = String::with_capacity(template.len() + 8);
    source.push('^');

    let mut rest = template;
    while let Some(brace) = rest.find(['{', '}']) {
        let (literal, tail) = rest.split_at(brace);
        source.push_str(&regex::escape(literal));

        if tail.starts_with('}') {
            return Err(unbalanced());
        }
        let close = tail.find('}').ok_or_else(unbalanced)?;
        let name = &tail[1..close];
        if name.contains('{') {
            return Err(unbalanced());
        }
        if name.is_empty() {
            return Err(PatternError::EmptyParameter {
                template: template.to_string(),
                offset: template.len() - tail.len(),
            });
        }

        let after = &tail[close + 1..];
        let wildcard = if name == GREEDY_PARAM && !after.starts_with('/') {
            REMAINDER
        } else {
            SEGMENT
        };
        source.push_str(wildcard);
        rest = after;
    }

    source.push_str(&regex::escape(rest));
    source.push('$');
    Ok(source)
}
