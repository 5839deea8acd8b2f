//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the route engine.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache key used when none is configured.
pub const DEFAULT_CACHE_KEY: &str = "route_engine.compiled_routes";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Matching and compilation behavior.
    pub router: RouterConfig,

    /// Compiled-route cache backend.
    pub cache: CacheConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// HTTP adapter settings.
    pub server: ServerConfig,

    /// Global parameter constraints (name → regex fragment).
    pub constraints: BTreeMap<String, String>,

    /// Route table.
    pub routes: Vec<RouteConfig>,
}

/// How a cached snapshot is judged against the live routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheValidation {
    /// Same number of routes.
    #[default]
    RouteCount,
    /// Same hash of method, pattern and constraints per route.
    Fingerprint,
}

/// Router behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Key of the single cache slot.
    pub cache_key: String,

    /// Validity check for cached snapshots.
    pub cache_validation: CacheValidation,

    /// Expiry of written snapshots in seconds (none = never).
    pub cache_ttl_secs: Option<u64>,

    /// Strip one trailing `/` from non-root paths (request and pattern).
    pub strip_trailing_slash: bool,
}

impl RouterConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            cache_validation: CacheValidation::default(),
            cache_ttl_secs: None,
            strip_trailing_slash: true,
        }
    }
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    None,
    Memory,
    File,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Directory for the file backend.
    pub directory: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// HTTP adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint address.
    pub metrics_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One configured route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// HTTP method, or `ANY` for every verb.
    #[serde(default = "default_method")]
    pub method: String,

    /// Path pattern (`/users/{id}`, `/files/{path:.+}`).
    pub path: String,

    /// Optional route name.
    #[serde(default)]
    pub name: Option<String>,

    /// Per-route parameter constraints.
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,

    /// Response served by the HTTP adapter.
    #[serde(default)]
    pub response: ResponseConfig,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Static response template.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub status: u16,

    /// Body text; `{name}` is replaced by the matched parameter.
    pub body: String,

    pub content_type: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
        }
    }
}
