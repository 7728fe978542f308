//! Byte caches and the cache-aside loader.

mod key_value;
mod loader;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use key_value::KeyValueCache;
pub use loader::{LoadError, load};
pub use memory::MemoryCache;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be greater than zero")]
    InvalidCapacity,

    #[error("cache backend failure: {0}")]
    Backend(String),

    #[error("cache payload is not JSON: {0}")]
    InvalidPayload(String),
}

/// String-keyed byte cache with per-entry expiry.
///
/// Implementations are shared between concurrent requests and must be
/// internally synchronised.
#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` is a miss; errors are backend failures.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

#[async_trait]
impl<C> Cache for Arc<C>
where
    C: Cache + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        (**self).set_with_ttl(key, value, ttl).await
    }
}
