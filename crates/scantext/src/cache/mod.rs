//! Content-addressed cache for recognition results.
//!
//! One JSON file per content digest. Identical input bytes always map to the
//! same key, so a re-upload of a previously recognized document is served
//! without touching the network. `put` is last-write-wins, which keeps
//! retries idempotent. There is no expiry; `clear` is the explicit
//! maintenance operation.
//!
//! All `.lock()` calls map `PoisonError` into `PipelineError::LockPoisoned`
//! instead of panicking, so a writer that panicked mid-flight surfaces as an
//! error on the next access rather than taking the process down.

use crate::error::{PipelineError, Result};
use crate::types::CacheEntry;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Hex width of a cache key: 128 bits of the content digest.
const CACHE_KEY_HEX_WIDTH: usize = 32;

/// Deterministic cache key: the first 16 bytes of SHA-256 over the raw
/// uploaded content, hex-encoded.
pub fn cache_key(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..CACHE_KEY_HEX_WIDTH / 2])
}

/// Returns true for well-formed cache keys.
pub fn validate_cache_key(key: &str) -> bool {
    key.len() == CACHE_KEY_HEX_WIDTH && key.chars().all(|c| c.is_ascii_hexdigit())
}

/// File-backed content-addressed store for [`CacheEntry`] values.
pub struct ResultCache {
    cache_dir: PathBuf,
    /// Serializes writers; two flows putting the same key must not interleave.
    write_lock: Mutex<()>,
}

impl ResultCache {
    /// Open (and create if missing) the cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .map_err(|e| PipelineError::storage_with_source("failed to create cache directory", e))?;
        Ok(Self {
            cache_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Look up an entry. Never mutates state. A missing file is a miss; an
    /// unreadable or corrupt file is a storage error, not a silent miss.
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read(&path)
            .map_err(|e| PipelineError::storage_with_source(format!("failed to read cache entry {}", key), e))?;
        let entry: CacheEntry = serde_json::from_slice(&content)?;
        Ok(Some(entry))
    }

    /// Store an entry, silently overwriting any previous value for the key.
    pub fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("cache write mutex poisoned: {}", e)))?;

        let json = serde_json::to_vec_pretty(entry)?;
        fs::write(self.entry_path(key), json)
            .map_err(|e| PipelineError::storage_with_source(format!("failed to write cache entry {}", key), e))?;
        Ok(())
    }

    /// Remove every entry. Returns the number of removed files.
    pub fn clear(&self) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("cache write mutex poisoned: {}", e)))?;

        let mut removed = 0;
        let read_dir = fs::read_dir(&self.cache_dir)
            .map_err(|e| PipelineError::storage_with_source("failed to read cache directory", e))?;

        for entry in read_dir {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("error reading cache entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(_) => removed += 1,
                Err(e) => tracing::debug!("failed to remove {:?}: {}", path, e),
            }
        }

        Ok(removed)
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> Result<usize> {
        let read_dir = fs::read_dir(&self.cache_dir)
            .map_err(|e| PipelineError::storage_with_source("failed to read cache directory", e))?;
        let count = read_dir
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
            .count();
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            text: "recognized text".to_string(),
            detected_language: "en".to_string(),
            processing_time: "0.80s".to_string(),
        }
    }

    #[test]
    fn test_cache_key_deterministic() {
        let key1 = cache_key(b"same bytes");
        let key2 = cache_key(b"same bytes");
        let key3 = cache_key(b"other bytes");
        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_eq!(key1.len(), 32);
        assert!(validate_cache_key(&key1));
    }

    #[test]
    fn test_validate_cache_key() {
        assert!(validate_cache_key("0123456789abcdef0123456789abcdef"));
        assert!(!validate_cache_key("0123456789abcdef"));
        assert!(!validate_cache_key("not a hex key at all............"));
    }

    #[test]
    fn test_get_miss() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();
        assert_eq!(cache.get(&cache_key(b"never stored")).unwrap(), None);
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();
        let key = cache_key(b"document bytes");

        cache.put(&key, &sample_entry()).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(sample_entry()));
    }

    #[test]
    fn test_put_overwrites() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();
        let key = cache_key(b"document bytes");

        cache.put(&key, &sample_entry()).unwrap();
        let updated = CacheEntry {
            text: "second pass".to_string(),
            ..sample_entry()
        };
        cache.put(&key, &updated).unwrap();
        assert_eq!(cache.get(&key).unwrap().unwrap().text, "second pass");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_storage_error_not_miss() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();
        let key = cache_key(b"document bytes");
        fs::write(cache.entry_path(&key), b"{ not json").unwrap();

        assert!(matches!(
            cache.get(&key).unwrap_err(),
            PipelineError::Serialization(_)
        ));
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();
        cache.put(&cache_key(b"a"), &sample_entry()).unwrap();
        cache.put(&cache_key(b"b"), &sample_entry()).unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.is_empty().unwrap());
    }
}
