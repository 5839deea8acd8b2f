//! File-backed cache that survives process restarts.
//!
//! # Responsibilities
//! - Store one JSON envelope per key in a directory
//! - Honor per-entry expiry
//! - Replace entries atomically (temporary file + rename)

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, RouteCache};

const EXTENSION: &str = "json";

/// On-disk representation of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    /// Expiry timestamp (milliseconds since epoch).
    expires_at_ms: Option<u64>,
    value: String,
}

impl Envelope {
    fn is_live(&self) -> bool {
        self.expires_at_ms.map_or(true, |at| at > now_millis())
    }
}

/// Directory-backed cache.
#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    /// Open a cache directory, creating it if needed.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", sanitize_key(key), EXTENSION))
    }
}

impl RouteCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope = serde_json::from_reader(BufReader::new(file))?;
        if envelope.is_live() {
            return Ok(Some(envelope.value));
        }
        tracing::debug!(key = %key, "Cache entry expired");
        self.delete(key)?;
        Ok(None)
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        let envelope = Envelope {
            expires_at_ms: ttl.map(|ttl| {
                let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
                now_millis().saturating_add(ttl_ms)
            }),
            value,
        };

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &envelope)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        tracing::debug!(key = %key, path = ?path, "Cache entry written");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.is_file() && is_cache_file(&path) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Map a cache key to a safe file stem.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn now_millis() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Entry files and leftovers of interrupted writes.
fn is_cache_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(&format!(".{}", EXTENSION)) || name.ends_with(&format!(".{}.tmp", EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        cache.set("route_engine.compiled_routes", "{}".into(), None).unwrap();

        let reopened = FileCache::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("route_engine.compiled_routes").unwrap().as_deref(),
            Some("{}")
        );
        assert!(!dir.path().join("route_engine.compiled_routes.json.tmp").exists());
    }

    #[test]
    fn test_missing_and_deleted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        assert!(cache.get("absent").unwrap().is_none());
        cache.delete("absent").unwrap();

        cache.set("k", "v".into(), None).unwrap();
        cache.delete("k").unwrap();
        assert!(!cache.has("k").unwrap());
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        cache.set("old", "v".into(), Some(Duration::ZERO)).unwrap();
        assert!(cache.get("old").unwrap().is_none());
        assert!(!dir.path().join("old.json").exists());
    }

    #[test]
    fn test_subsecond_ttl_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        cache.set("short", "v".into(), Some(Duration::from_millis(900))).unwrap();
        assert_eq!(cache.get("short").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_clear_removes_interrupted_writes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        fs::write(dir.path().join("k.json.tmp"), "partial").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        cache.clear().unwrap();
        assert!(!dir.path().join("k.json.tmp").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_clear_and_key_sanitizing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        cache.set("../escape/key", "v".into(), None).unwrap();
        assert!(dir.path().join(".._escape_key.json").exists());

        cache.clear().unwrap();
        assert!(cache.get("../escape/key").unwrap().is_none());
    }
}
