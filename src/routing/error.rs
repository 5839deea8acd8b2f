//! Errors surfaced by the router.
//!
//! Matching never fails: an unmatched path is `None`. Only the convenience
//! paths that act on a match raise.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// `dispatch` found no route.
    #[error("No route matches {method} {path}")]
    NotFound { method: String, path: String },

    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

impl RouterError {
    /// HTTP status a host layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            RouterError::NotFound { .. } => 404,
            RouterError::Unimplemented(_) => 501,
        }
    }
}
