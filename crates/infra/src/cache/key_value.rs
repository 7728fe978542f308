use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key_value::KeyValueStore;

use super::{Cache, CacheError};

const DEFAULT_PREFIX: &str = "cache:";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    expires_at: DateTime<Utc>,
    payload: Value,
}

/// Cache persisted in the `key_values` table, so entries outlive the process.
///
/// Payloads must be JSON, which is what [`super::load`] writes. Expired rows
/// are left in place and report a miss until overwritten.
#[derive(Debug, Clone)]
pub struct KeyValueCache {
    store: KeyValueStore,
    prefix: String,
}

impl KeyValueCache {
    pub fn new(store: KeyValueStore) -> Self {
        Self {
            store,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Namespace for cache rows, `cache:` by default.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl Cache for KeyValueCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entry = match self.store.get::<StoredEntry>(&self.storage_key(key)).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(CacheError::Backend(e.to_string())),
        };
        if entry.expires_at <= Utc::now() {
            return Ok(None);
        }
        serde_json::to_vec(&entry.payload)
            .map(Some)
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let payload: Value = serde_json::from_slice(&value)
            .map_err(|e| CacheError::InvalidPayload(e.to_string()))?;
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.store
            .set(&self.storage_key(key), &StoredEntry { expires_at, payload })
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::load;
    use crate::test_support::{kv_store, unique_key};
    use scopekit_core::CodedError;

    #[tokio::test]
    async fn non_json_payloads_are_rejected() {
        // Rejected before the store is touched, so an unreachable pool is fine.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let cache = KeyValueCache::new(KeyValueStore::new(pool));
        let err = cache
            .set_with_ttl("k", vec![0xff, 0x00], Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidPayload(_)), "{err:?}");
    }

    #[tokio::test]
    async fn entries_survive_a_new_cache_instance() {
        let Some(store) = kv_store().await else {
            return;
        };
        let key = unique_key("loader");

        let first: Vec<u32> = load(&KeyValueCache::new(store.clone()), &key, Duration::from_secs(60), || async {
            Ok::<_, CodedError>(vec![1, 2, 3])
        })
        .await
        .unwrap();

        let second: Vec<u32> = load(&KeyValueCache::new(store.clone()), &key, Duration::from_secs(60), || async {
            Ok::<_, CodedError>(vec![9])
        })
        .await
        .unwrap();

        assert_eq!(first, [1, 2, 3]);
        assert_eq!(second, [1, 2, 3]);

        let raw: serde_json::Value = store.get(&format!("cache:{key}")).await.unwrap();
        assert_eq!(raw["payload"], serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let Some(store) = kv_store().await else {
            return;
        };
        let cache = KeyValueCache::new(store).with_prefix("test-cache:");
        let key = unique_key("expired");

        cache
            .set_with_ttl(&key, b"\"v\"".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache
            .set_with_ttl(&key, b"\"v\"".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"\"v\"".to_vec()));
    }
}
