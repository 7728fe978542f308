//! Application wiring: store pool, caches, credential service and router.
//!
//! - `routes/`: route builders mounted here or by callers

use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use scopekit_auth::{CredentialProvider, CredentialService};
use scopekit_infra::{AppConfig, CacheError, KeyValueStore, MemoryCache, Repository};

use crate::middleware::{CredentialState, credential_middleware};

pub mod routes;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid database url: {0}")]
    Database(#[source] sqlx::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared handles for route builders. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub repository: Repository,
    pub key_values: KeyValueStore,
    pub cache: Arc<MemoryCache>,
    pub credentials: Arc<CredentialService>,
}

/// Router under construction.
///
/// Public routes are served as-is; protected routes sit behind the credential
/// middleware, which is applied once in [`Application::into_router`].
pub struct Application {
    config: AppConfig,
    state: AppState,
    public: Router,
    protected: Router,
}

impl Application {
    /// Build the pool, caches and credential service. The pool connects
    /// lazily, so this succeeds without a reachable database.
    pub fn new(config: AppConfig) -> Result<Self, BootstrapError> {
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url())
            .map_err(BootstrapError::Database)?;

        let state = AppState {
            repository: Repository::new(pool.clone()),
            key_values: KeyValueStore::new(pool),
            cache: Arc::new(MemoryCache::new(config.cache.size)?),
            credentials: Arc::new(CredentialService::new(
                config.credential.secret.as_bytes(),
                config.credential.ttl(),
            )),
        };

        let public = Router::new().route("/health", routes::health_route());

        Ok(Self {
            config,
            state,
            public,
            protected: Router::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Mount `/credential/issue` (public) and `/credential` (protected).
    pub fn with_credential_routes(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        let issue = routes::issue_route(self.state.credentials.clone(), provider);
        self.public = self.public.route("/credential/issue", issue);
        self.protected = self.protected.route("/credential", routes::parse_route());
        self
    }

    /// Add routes that need no credential.
    pub fn merge(mut self, router: Router) -> Self {
        self.public = self.public.merge(router);
        self
    }

    /// Add routes that run behind the credential middleware.
    pub fn merge_protected(mut self, router: Router) -> Self {
        self.protected = self.protected.merge(router);
        self
    }

    /// Merge both halves. The credential check is a route layer, so paths
    /// that match nothing fall through to the plain 404.
    pub fn into_router(self) -> Router {
        let credential_state = CredentialState::new(self.state.credentials.clone());
        let protected = self.protected.route_layer(axum::middleware::from_fn_with_state(
            credential_state,
            credential_middleware,
        ));

        self.public.merge(protected)
    }

    /// Bind the configured address and serve until the process stops.
    pub async fn serve(self) -> Result<(), BootstrapError> {
        let address = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|source| BootstrapError::Bind {
                address: address.clone(),
                source,
            })?;

        tracing::info!(%address, "listening");
        axum::serve(listener, self.into_router())
            .await
            .map_err(BootstrapError::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn builds_without_a_database() {
        let app = Application::new(AppConfig::default()).unwrap();
        assert_eq!(app.state().cache.capacity(), 1024);
        assert_eq!(app.config().bind_address(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn zero_cache_size_is_rejected() {
        let mut config = AppConfig::default();
        config.cache.size = 0;
        assert!(matches!(
            Application::new(config),
            Err(BootstrapError::Cache(CacheError::InvalidCapacity))
        ));
    }

    #[tokio::test]
    async fn unmatched_paths_skip_the_credential_check() {
        let router = Application::new(AppConfig::default())
            .unwrap()
            .merge_protected(Router::new().route("/secret", routes::health_route()))
            .into_router();

        let missing = router.clone().oneshot(get("/nope")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let guarded = router.oneshot(get("/secret")).await.unwrap();
        assert_eq!(guarded.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(guarded.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["Code"], 110_004);
    }
}
