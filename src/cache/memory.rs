//! In-process cache backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::cache::{CacheError, RouteCache};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// A thread-safe in-memory cache.
///
/// Clones share the same storage, so two routers built from clones of one
/// `MemoryCache` see each other's snapshots.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl RouteCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = match self.inner.get(key) {
            Some(entry) if entry.is_live() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.inner.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.inner.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear();
        Ok(())
    }
}
