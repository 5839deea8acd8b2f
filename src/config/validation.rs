//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route patterns, methods and names
//! - Check that configured constraints are valid regex fragments
//! - Validate server addresses and response status codes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - A pattern that would only compile through the fallback is rejected here;
//!   the router itself would still accept it

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{CacheBackend, EngineConfig};
use crate::routing::route::{PatternMode, Route};
use crate::routing::HTTP_METHODS;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index}: path must start with '/' (got {path:?})")]
    InvalidPath { index: usize, path: String },

    #[error("route #{index}: unknown method {method:?}")]
    UnknownMethod { index: usize, method: String },

    #[error("route #{index}: pattern {path:?} does not compile")]
    InvalidPattern { index: usize, path: String },

    #[error("constraint for {param:?} is not a valid regex: {regex:?}")]
    InvalidConstraint { param: String, regex: String },

    #[error("duplicate route name {0:?}")]
    DuplicateName(String),

    #[error("route #{index}: invalid status code {status}")]
    InvalidStatus { index: usize, status: u16 },

    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("cache backend 'file' requires a directory")]
    MissingCacheDirectory,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_constraints(&config.constraints, &mut errors);

    let mut names = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                index,
                path: route.path.clone(),
            });
        }

        let method = route.method.to_ascii_uppercase();
        if method != "ANY" && !HTTP_METHODS.contains(&method.as_str()) {
            errors.push(ValidationError::UnknownMethod {
                index,
                method: route.method.clone(),
            });
        }

        validate_constraints(&route.constraints, &mut errors);

        let mut probe = Route::new(method, route.path.as_str(), ());
        probe.where_params(route.constraints.clone());
        probe.where_params(config.constraints.clone());
        if !probe.is_static() && probe.compiled().mode() != PatternMode::Full {
            errors.push(ValidationError::InvalidPattern {
                index,
                path: route.path.clone(),
            });
        }

        if let Some(name) = &route.name {
            if !names.insert(name.as_str()) {
                errors.push(ValidationError::DuplicateName(name.clone()));
            }
        }

        if !(100..=599).contains(&route.response.status) {
            errors.push(ValidationError::InvalidStatus {
                index,
                status: route.response.status,
            });
        }
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "bind",
            value: config.server.bind_address.clone(),
        });
    }
    if config.server.metrics_enabled && config.server.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "metrics",
            value: config.server.metrics_address.clone(),
        });
    }

    if config.cache.backend == CacheBackend::File && config.cache.directory.is_none() {
        errors.push(ValidationError::MissingCacheDirectory);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_constraints(constraints: &BTreeMap<String, String>, errors: &mut Vec<ValidationError>) {
    for (param, regex) in constraints {
        if regex::Regex::new(&format!("^(?:{})$", regex)).is_err() {
            errors.push(ValidationError::InvalidConstraint {
                param: param.clone(),
                regex: regex.clone(),
            });
        }
    }
}
