//! Outbound JSON over HTTP.
//!
//! TLS settings live on each client. Certificate verification stays on unless
//! the caller builds a client with [`HttpClientConfig::danger_accept_invalid_certs`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use scopekit_core::{CodecError, decode, encode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

impl HttpClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip certificate verification for this client only.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http client setup failed: {0}")]
    Build(#[source] reqwest::Error),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("remote returned {0}: {1}")]
    Status(u16, String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(config: &HttpClientConfig) -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { inner, token: None })
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        self.send(self.inner.get(url)).await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(encode(body)?);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, mut request: reqwest::RequestBuilder) -> Result<T, HttpError> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(HttpError::Network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(HttpError::Network)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "remote call failed");
            return Err(HttpError::Status(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        Ok(decode(&body)?)
    }
}
