//! In-process cache store.
//!
//! Bounded LRU with per-entry TTL, expired lazily on read. Suitable for a
//! single service instance and for tests.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::cache::{CacheBackend, CacheError};
use crate::codec::CompressedEntry;

/// Default number of entries kept before LRU eviction.
pub const DEFAULT_CAPACITY: usize = 10_000;

struct StoredEntry {
    entry: CompressedEntry,
    inserted_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// In-memory cache backend.
pub struct MemoryBackend {
    entries: Mutex<LruCache<String, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, including expired ones not yet read.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrite the raw entry for a key. Lets tests plant corrupt data.
    pub async fn insert_raw(&self, key: &str, entry: CompressedEntry) {
        self.entries.lock().await.put(
            key.to_string(),
            StoredEntry {
                entry,
                inserted_at: Instant::now(),
                ttl: Duration::MAX,
            },
        );
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn put_entry(&self, key: &str, entry: CompressedEntry, ttl: Duration) -> Result<(), CacheError> {
        self.entries.lock().await.put(
            key.to_string(),
            StoredEntry {
                entry,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn get_entry(&self, key: &str) -> Result<Option<CompressedEntry>, CacheError> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(key) {
            Some(stored) if stored.is_expired() => true,
            Some(stored) => return Ok(Some(stored.entry.clone())),
            None => return Ok(None),
        };

        if expired {
            entries.pop(key);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn entry(byte: u8) -> CompressedEntry {
        CompressedEntry {
            uncompressed_len: 1,
            data: Bytes::from(vec![byte]),
        }
    }

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let backend = MemoryBackend::default();
        backend.put_entry("k", entry(1), Duration::from_secs(60)).await.unwrap();
        backend.put_entry("k", entry(2), Duration::from_secs(60)).await.unwrap();
        assert_eq!(backend.get_entry("k").await.unwrap(), Some(entry(2)));
        assert_eq!(backend.get_entry("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let backend = MemoryBackend::default();
        backend.put_entry("k", entry(1), Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(backend.get_entry("k").await.unwrap(), None);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let backend = MemoryBackend::new(2);
        let ttl = Duration::from_secs(60);
        backend.put_entry("a", entry(1), ttl).await.unwrap();
        backend.put_entry("b", entry(2), ttl).await.unwrap();
        // Touch "a" so "b" becomes least recently used.
        backend.get_entry("a").await.unwrap();
        backend.put_entry("c", entry(3), ttl).await.unwrap();

        assert!(backend.get_entry("a").await.unwrap().is_some());
        assert!(backend.get_entry("b").await.unwrap().is_none());
        assert!(backend.get_entry("c").await.unwrap().is_some());
    }
}
