use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use scopekit_core::{CodecError, CodedError, decode, encode};

use super::{Cache, CacheError};

#[derive(Debug, Error)]
pub enum LoadError<E> {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Supplier(E),
}

impl<E> From<LoadError<E>> for CodedError
where
    E: Into<CodedError>,
{
    fn from(value: LoadError<E>) -> Self {
        match value {
            LoadError::Supplier(e) => e.into(),
            LoadError::Cache(e) => CodedError::from_error(&e),
            LoadError::Codec(e) => CodedError::from_error(&e),
        }
    }
}

/// Return the cached value for `key`, or compute it with `supplier` and cache it
/// for `ttl`.
///
/// A backend error from the cache is returned without calling the supplier. A
/// failed supplier leaves the cache untouched. Concurrent misses on one key may
/// each run the supplier; the last write wins.
pub async fn load<T, C, F, Fut, E>(
    cache: &C,
    key: &str,
    ttl: Duration,
    supplier: F,
) -> Result<T, LoadError<E>>
where
    T: Serialize + DeserializeOwned,
    C: Cache + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(bytes) = cache.get(key).await? {
        tracing::trace!(key, "cache hit");
        return Ok(decode(&bytes)?);
    }

    tracing::debug!(key, "cache miss");
    let value = supplier().await.map_err(LoadError::Supplier)?;
    cache.set_with_ttl(key, encode(&value)?, ttl).await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = MemoryCache::new(16).unwrap();

        let first: Vec<String> = load(&cache, "k", TTL, || async {
            Ok::<_, CodedError>(vec!["first".to_string()])
        })
        .await
        .unwrap();
        let second: Vec<String> = load(&cache, "k", TTL, || async {
            Ok::<_, CodedError>(vec!["second".to_string()])
        })
        .await
        .unwrap();

        assert_eq!(first, ["first"]);
        assert_eq!(second, ["first"]);
    }

    #[tokio::test]
    async fn supplier_runs_again_after_ttl() {
        let cache = MemoryCache::new(16).unwrap();
        let calls = &AtomicUsize::new(0);
        let ttl = Duration::from_millis(30);

        for _ in 0..2 {
            let n: usize = load(&cache, "k", ttl, move || async move {
                Ok::<_, CodedError>(calls.fetch_add(1, Ordering::SeqCst))
            })
            .await
            .unwrap();
            assert_eq!(n, 0);
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        let n: usize = load(&cache, "k", ttl, move || async move {
            Ok::<_, CodedError>(calls.fetch_add(1, Ordering::SeqCst))
        })
        .await
        .unwrap();

        assert_eq!(n, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_supplier_is_not_cached() {
        let cache = MemoryCache::new(16).unwrap();

        let err = load::<String, _, _, _, _>(&cache, "k", TTL, || async {
            Err(CodedError::from_text("[110002]: lookup failed"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, LoadError::Supplier(ref e) if e.message() == "lookup failed"));
        assert!(cache.is_empty());

        let ok: String = load(&cache, "k", TTL, || async { Ok::<_, CodedError>("v".to_string()) })
            .await
            .unwrap();
        assert_eq!(ok, "v");
    }

    #[tokio::test]
    async fn undecodable_entry_is_an_error() {
        let cache = MemoryCache::new(16).unwrap();
        cache.set("k", b"not json".to_vec());

        let err = load::<u32, _, _, _, _>(&cache, "k", TTL, || async { Ok::<_, CodedError>(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Codec(_)));
    }

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Backend("connection reset".into()))
        }

        async fn set_with_ttl(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn backend_errors_skip_the_supplier() {
        let calls = &AtomicUsize::new(0);
        let err = load::<u32, _, _, _, _>(&BrokenCache, "k", TTL, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CodedError>(1)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, LoadError::Cache(CacheError::Backend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn load_errors_keep_supplier_codes() {
        let coded: CodedError =
            LoadError::Supplier(CodedError::from_text("[110002]: lookup failed")).into();
        assert_eq!(coded.code().value(), 110_002);

        let coded: CodedError = LoadError::<CodedError>::Cache(CacheError::InvalidCapacity).into();
        assert_eq!(coded.code().value(), 100_000);
    }

    #[tokio::test]
    async fn works_through_a_trait_object() {
        let cache: std::sync::Arc<dyn Cache> = std::sync::Arc::new(MemoryCache::new(4).unwrap());
        let v: u8 = load(cache.as_ref(), "k", TTL, || async { Ok::<_, CodedError>(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
        assert_eq!(cache.get("k").await.unwrap(), Some(b"7".to_vec()));
    }
}
