//! Path pattern parsing and regex assembly.
//!
//! # Responsibilities
//! - Split a path pattern into literal runs and `{name}` / `{name:regex}` placeholders
//! - Locate the balanced closing brace so fragments like `\d{2,4}` survive
//! - Render the token list into a regex body with caller-chosen group names
//!
//! # Design Decisions
//! - Literal runs are escaped, caller fragments are trusted verbatim
//! - Capture groups are named positionally (`p0`, `r3_p0`, ...) so parameter
//!   names never have to be valid regex group names
//! - An unbalanced `{` ends parsing: the literal text before it is kept, the
//!   rest of the pattern is dropped

use std::collections::BTreeMap;

/// Fragment used for a parameter with no inline regex and no constraint.
pub const DEFAULT_PARAM_PATTERN: &str = "[^/]+";

/// One piece of a parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param {
        name: String,
        fragment: Option<String>,
    },
}

/// Result of scanning a path pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPattern {
    pub tokens: Vec<Token>,
    /// Set when an unbalanced `{` cut the pattern short.
    pub truncated: bool,
}

impl ParsedPattern {
    /// Placeholder names in order of appearance.
    pub fn parameter_names(&self) -> Vec<String> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Param { name, .. } => Some(name.clone()),
                Token::Literal(_) => None,
            })
            .collect()
    }
}

/// How placeholder fragments are chosen while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPolicy {
    /// Inline fragment, then constraint, then the default.
    Full,
    /// Every placeholder becomes the default single-segment fragment.
    Naive,
}

/// Scan a path pattern left to right.
pub fn parse(path: &str) -> ParsedPattern {
    let bytes = path.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        if literal_start < i {
            tokens.push(Token::Literal(path[literal_start..i].to_string()));
        }

        let Some(close) = closing_brace(bytes, i) else {
            return ParsedPattern {
                tokens,
                truncated: true,
            };
        };

        let inner = &path[i + 1..close];
        let (name, fragment) = match inner.split_once(':') {
            Some((name, fragment)) if !fragment.is_empty() => (name, Some(fragment.to_string())),
            Some((name, _)) => (name, None),
            None => (inner, None),
        };
        tokens.push(Token::Param {
            name: name.to_string(),
            fragment,
        });

        i = close + 1;
        literal_start = i;
    }

    if literal_start < bytes.len() {
        tokens.push(Token::Literal(path[literal_start..].to_string()));
    }

    ParsedPattern {
        tokens,
        truncated: false,
    }
}

/// Index of the `}` closing the `{` at `open`, honoring nested braces.
fn closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Render tokens into an unanchored regex body.
///
/// `group_name(k)` names the capture group of the k-th placeholder.
pub fn render<F>(
    parsed: &ParsedPattern,
    constraints: &BTreeMap<String, String>,
    policy: FragmentPolicy,
    group_name: F,
) -> String
where
    F: Fn(usize) -> String,
{
    let mut body = String::new();
    let mut param_index = 0;

    for token in &parsed.tokens {
        match token {
            Token::Literal(text) => body.push_str(&regex::escape(text)),
            Token::Param { name, fragment } => {
                let fragment = match policy {
                    FragmentPolicy::Full => fragment
                        .as_deref()
                        .or_else(|| constraints.get(name).map(String::as_str))
                        .unwrap_or(DEFAULT_PARAM_PATTERN),
                    FragmentPolicy::Naive => DEFAULT_PARAM_PATTERN,
                };
                body.push_str("(?P<");
                body.push_str(&group_name(param_index));
                body.push('>');
                body.push_str(fragment);
                body.push(')');
                param_index += 1;
            }
        }
    }

    body
}

/// Wrap a body so it must span the whole path.
pub fn anchor(body: &str) -> String {
    format!("^{}$", body)
}

/// Group name used for the k-th parameter of a standalone route pattern.
pub fn param_group(k: usize) -> String {
    format!("p{}", k)
}

/// First path segment, ignoring one leading `/`.
pub fn first_segment(path: &str) -> &str {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').next().unwrap_or("")
}
