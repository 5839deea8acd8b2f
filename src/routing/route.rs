//! A single registered route and its compiled matcher.
//!
//! # Responsibilities
//! - Classify the pattern as static or dynamic
//! - Compile the pattern (plus constraints) into an anchored regex
//! - Match a request path and extract parameters
//!
//! # Design Decisions
//! - Static routes compare strings, no regex involved
//! - Dynamic routes reject on the literal prefix before running the regex
//! - Constraint changes recompile immediately
//! - A pattern that fails to compile falls back to a naive single-segment
//!   pattern; matching never returns an error

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::routing::params::Params;
use crate::routing::pattern::{self, FragmentPolicy, ParsedPattern};

/// Static (exact) or dynamic (regex) route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Static,
    Dynamic,
}

/// Which rendering produced the compiled regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    /// Inline fragments and constraints honored.
    Full,
    /// Naive substitution after the full pattern failed to compile.
    Fallback,
    /// Nothing compiled; the route never matches.
    Unmatchable,
}

/// Anchored regex compiled from the pattern and its constraints.
#[derive(Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Option<Regex>,
    mode: PatternMode,
}

impl CompiledPattern {
    /// Regex source text (anchored).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("source", &self.source)
            .field("mode", &self.mode)
            .finish()
    }
}

/// A route: method, path pattern and an opaque handler.
#[derive(Debug, Clone)]
pub struct Route<H> {
    method: String,
    path: String,
    handler: H,
    name: Option<String>,
    parsed: ParsedPattern,
    parameter_names: Vec<String>,
    constraints: BTreeMap<String, String>,
    kind: RouteKind,
    static_prefix: String,
    compiled: CompiledPattern,
}

impl<H> Route<H> {
    /// Create and compile a route. The method is uppercased.
    pub fn new(method: impl Into<String>, path: impl Into<String>, handler: H) -> Self {
        let method = method.into().to_ascii_uppercase();
        let path = path.into();
        let parsed = pattern::parse(&path);
        let parameter_names = parsed.parameter_names();
        let kind = if path.contains('{') {
            RouteKind::Dynamic
        } else {
            RouteKind::Static
        };
        let static_prefix = match path.find('{') {
            Some(idx) => path[..idx].to_string(),
            None => path.clone(),
        };

        let mut route = Self {
            method,
            path,
            handler,
            name: None,
            parsed,
            parameter_names,
            constraints: BTreeMap::new(),
            kind,
            static_prefix,
            compiled: CompiledPattern {
                source: String::new(),
                regex: None,
                mode: PatternMode::Unmatchable,
            },
        };
        route.compile();
        route
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The registered path pattern.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == RouteKind::Static
    }

    /// Literal text before the first placeholder.
    pub fn static_prefix(&self) -> &str {
        &self.static_prefix
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter_names.iter().any(|n| n == name)
    }

    /// Per-parameter regex overrides.
    pub fn constraints(&self) -> &BTreeMap<String, String> {
        &self.constraints
    }

    pub fn compiled(&self) -> &CompiledPattern {
        &self.compiled
    }

    /// Regex source for dynamic routes, the path itself for static ones.
    pub fn pattern(&self) -> &str {
        match self.kind {
            RouteKind::Static => &self.path,
            RouteKind::Dynamic => &self.compiled.source,
        }
    }

    /// Constrain one parameter and recompile.
    pub fn where_param(&mut self, name: impl Into<String>, regex: impl Into<String>) -> &mut Self {
        self.constraints.insert(name.into(), regex.into());
        self.compile();
        self
    }

    /// Constrain several parameters and recompile once.
    pub fn where_params<I, K, V>(&mut self, constraints: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, regex) in constraints {
            self.constraints.insert(name.into(), regex.into());
        }
        self.compile();
        self
    }

    /// Match a request path, returning the extracted parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        match self.kind {
            RouteKind::Static => (self.path == path).then(Params::new),
            RouteKind::Dynamic => {
                if !path.starts_with(&self.static_prefix) {
                    return None;
                }
                let regex = self.compiled.regex.as_ref()?;
                let captures = regex.captures(path)?;
                let mut params = Params::new();
                for (k, name) in self.parameter_names.iter().enumerate() {
                    if let Some(value) = captures.name(&pattern::param_group(k)) {
                        params.insert(name.as_str(), value.as_str());
                    }
                }
                Some(params)
            }
        }
    }

    /// Unanchored body for a combined group pattern, with the parameter
    /// groups renamed by `group_name`. Uses the same rendering as the
    /// route's own compiled pattern.
    pub(crate) fn body_with_groups<F>(&self, group_name: F) -> String
    where
        F: Fn(usize) -> String,
    {
        let policy = match self.compiled.mode {
            PatternMode::Full => FragmentPolicy::Full,
            PatternMode::Fallback | PatternMode::Unmatchable => FragmentPolicy::Naive,
        };
        pattern::render(&self.parsed, &self.constraints, policy, group_name)
    }

    fn compile(&mut self) {
        if self.kind == RouteKind::Static {
            self.compiled = CompiledPattern {
                source: pattern::anchor(&regex::escape(&self.path)),
                regex: None,
                mode: PatternMode::Full,
            };
            return;
        }

        let body = pattern::render(
            &self.parsed,
            &self.constraints,
            FragmentPolicy::Full,
            pattern::param_group,
        );
        let source = pattern::anchor(&body);
        match Regex::new(&source) {
            Ok(regex) => {
                self.compiled = CompiledPattern {
                    source,
                    regex: Some(regex),
                    mode: PatternMode::Full,
                };
            }
            Err(err) => {
                tracing::warn!(
                    method = %self.method,
                    path = %self.path,
                    error = %err,
                    "Route pattern failed to compile, using fallback"
                );
                self.compile_fallback();
            }
        }
    }

    fn compile_fallback(&mut self) {
        let body = pattern::render(
            &self.parsed,
            &self.constraints,
            FragmentPolicy::Naive,
            pattern::param_group,
        );
        let source = pattern::anchor(&body);
        self.compiled = match Regex::new(&source) {
            Ok(regex) => CompiledPattern {
                source,
                regex: Some(regex),
                mode: PatternMode::Fallback,
            },
            Err(err) => {
                tracing::warn!(
                    method = %self.method,
                    path = %self.path,
                    error = %err,
                    "Fallback pattern failed to compile, route disabled"
                );
                CompiledPattern {
                    source,
                    regex: None,
                    mode: PatternMode::Unmatchable,
                }
            }
        };
    }
}
