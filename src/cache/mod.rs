//! Compiled-route cache backends.
//!
//! # Data Flow
//! ```text
//! Router (fresh compile)
//!     → CachedTable → JSON text
//!     → RouteCache::set(key, text, ttl)
//!
//! Router (construction)
//!     → RouteCache::get(key)
//!     → JSON text → CachedTable → validity check → rehydrate
//! ```
//!
//! # Design Decisions
//! - Values are opaque strings; the router owns the payload format
//! - Backends guarantee read-your-writes within one process only
//! - The file backend replaces entries by write-then-rename
//! - Cache failures are logged by callers and treated as a miss

pub mod file;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::{CacheBackend, CacheConfig};

pub use file::FileCache;
pub use memory::MemoryCache;

/// Error type for cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache directory not configured")]
    MissingDirectory,
}

/// Key/value store for compiled-route snapshots.
pub trait RouteCache: Send + Sync {
    /// Fetch a live (non-expired) value.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value, optionally expiring after `ttl`.
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), CacheError>;

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Build the backend selected in configuration.
pub fn build_cache(config: &CacheConfig) -> Result<Option<Arc<dyn RouteCache>>, CacheError> {
    match config.backend {
        CacheBackend::None => Ok(None),
        CacheBackend::Memory => Ok(Some(Arc::new(MemoryCache::new()))),
        CacheBackend::File => {
            let directory = config
                .directory
                .as_ref()
                .map(PathBuf::from)
                .ok_or(CacheError::MissingDirectory)?;
            let cache = FileCache::open(directory)?;
            Ok(Some(Arc::new(cache)))
        }
    }
}
