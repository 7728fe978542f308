//! Infrastructure layer: Postgres query scopes, key/value storage, caches,
//! outbound HTTP and configuration.

pub mod cache;
pub mod config;
pub mod http;
pub mod key_value;
pub mod repository;
pub mod scope;

pub use cache::{Cache, CacheError, KeyValueCache, LoadError, MemoryCache, load};
pub use config::{AppConfig, ConfigError, LogLevel};
pub use http::{HttpClient, HttpClientConfig, HttpError};
pub use key_value::{KeyValueRecord, KeyValueStore};
pub use repository::{Repository, StoreError, Table};
pub use scope::{Action, Filter, Order, Page, Pagination, ScopesParams, column_name};
