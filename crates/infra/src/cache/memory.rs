use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use super::{Cache, CacheError};

#[derive(Debug)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Size-bounded in-process cache; the least recently used entry is evicted
/// when a new key arrives at capacity.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::InvalidCapacity)?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store without expiry.
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.lock().put(
            key.into(),
            Entry {
                bytes: value,
                expires_at: None,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().pop(key).map(|e| e.bytes)
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.bytes.clone());
        }
        entries.pop(key);
        None
    }

    fn set_at(&self, key: &str, value: Vec<u8>, ttl: Duration, now: Instant) {
        // An unrepresentable deadline is treated as no expiry.
        let expires_at = now.checked_add(ttl);
        self.entries.lock().put(
            key.to_string(),
            Entry {
                bytes: value,
                expires_at,
            },
        );
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.get_at(key, Instant::now()))
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.set_at(key, value, ttl, Instant::now());
        Ok(())
    }
}
