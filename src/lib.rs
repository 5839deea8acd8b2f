//! HTTP route matching and compilation engine.
//!
//! Matches a (method, path) pair against registered route patterns,
//! extracts path parameters, and keeps an optional cache of the compiled
//! table across process restarts.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use cache::{FileCache, MemoryCache, RouteCache};
pub use config::EngineConfig;
pub use routing::{Params, RouteOptions, Router, RouterError};
