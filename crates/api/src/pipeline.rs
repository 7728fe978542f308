//! Typed handler to axum handler adapter.
//!
//! Each request gets a serial number, a bound body and the verified credential
//! (if any); the handler's result or error is rendered as a
//! [`ResponseEnvelope`].

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use axum::body::Body;
use axum::extract::{FromRequestParts, Query, RawPathParams, Request};
use axum::handler::Handler;
use axum::http::Uri;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;

use scopekit_auth::Credential;
use scopekit_core::{CodedError, ErrorCode, SerialNum, decode, to_pretty_json};

use crate::context::RequestContext;
use crate::envelope::{ResponseEnvelope, failure_response};

/// Name of the optional path parameter copied into [`RequestContext::resource`].
pub const RESOURCE_PARAM: &str = "Resource";

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Marker for the [`Handler`] impl of [`Endpoint`].
#[derive(Debug, Clone, Copy)]
pub struct Pipeline;

/// A typed handler wrapped for the router. Build with [`wrap`].
pub struct Endpoint<F, Req> {
    handler: F,
    bind_code: ErrorCode,
    _req: PhantomData<fn() -> Req>,
}

impl<F: Clone, Req> Clone for Endpoint<F, Req> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            bind_code: self.bind_code,
            _req: PhantomData,
        }
    }
}

impl<F, Req> core::fmt::Debug for Endpoint<F, Req> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Endpoint")
            .field("bind_code", &self.bind_code)
            .finish_non_exhaustive()
    }
}

/// Wrap `handler` so it can be mounted on a route.
///
/// A body that does not bind to `Req` is answered with code `100000` and the
/// handler is not called.
pub fn wrap<F, Fut, Req, Res, E>(handler: F) -> Endpoint<F, Req>
where
    F: Fn(RequestContext<Req>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, E>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + 'static,
    E: Into<CodedError> + 'static,
{
    Endpoint {
        handler,
        bind_code: ErrorCode::BIND,
        _req: PhantomData,
    }
}

impl<F, Req> Endpoint<F, Req> {
    /// Code rendered when the body fails to bind.
    pub fn with_bind_code(mut self, code: ErrorCode) -> Self {
        self.bind_code = code;
        self
    }

    pub fn bind_code(&self) -> ErrorCode {
        self.bind_code
    }
}

impl<F, Fut, Req, Res, E, S> Handler<Pipeline, S> for Endpoint<F, Req>
where
    F: Fn(RequestContext<Req>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, E>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + 'static,
    E: Into<CodedError> + 'static,
    S: Send + Sync + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, _state: S) -> Self::Future {
        let serial_num = SerialNum::generate();
        let span = tracing::info_span!(
            "request",
            serial_num = %serial_num,
            method = %req.method(),
            path = %req.uri().path(),
        );
        Box::pin(self.run(serial_num, req).instrument(span))
    }
}

impl<F, Fut, Req, Res, E> Endpoint<F, Req>
where
    F: Fn(RequestContext<Req>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, E>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + 'static,
    E: Into<CodedError> + 'static,
{
    async fn run(self, serial_num: SerialNum, req: Request) -> Response {
        let (mut parts, body) = req.into_parts();
        let resource = resource_param(&mut parts).await;

        let body = match bind::<Req>(&parts.uri, body).await {
            Ok(body) => body,
            Err(message) => {
                tracing::warn!(code = %self.bind_code, error = %message, "request body did not bind");
                return failure_response(serial_num, CodedError::new(self.bind_code, message));
            }
        };

        let credential = parts
            .extensions
            .get::<Credential>()
            .cloned()
            .unwrap_or_default();

        let ctx = RequestContext {
            serial_num: serial_num.clone(),
            resource,
            credential,
            body,
        };

        match (self.handler)(ctx).await {
            Ok(result) => {
                tracing::debug!(data = %to_pretty_json(&result), "handled");
                ResponseEnvelope::success(serial_num, result).into_response()
            }
            Err(err) => {
                let err: CodedError = err.into();
                tracing::info!(code = %err.code(), error = err.message(), "handler failed");
                failure_response(serial_num, err)
            }
        }
    }
}

async fn resource_param(parts: &mut Parts) -> Option<String> {
    let params = RawPathParams::from_request_parts(parts, &()).await.ok()?;
    params
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(RESOURCE_PARAM))
        .map(|(_, value)| value.to_string())
}

/// Bind the request into `T`.
///
/// A non-blank body is JSON. Otherwise the query string is used, and with
/// neither present `T` is built from `null` or, failing that, `{}`.
async fn bind<T: DeserializeOwned>(uri: &Uri, body: Body) -> Result<T, String> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| e.to_string())?;

    if !bytes.iter().all(u8::is_ascii_whitespace) {
        tracing::debug!(body = %String::from_utf8_lossy(&bytes), "request body");
        return decode(&bytes).map_err(|e| e.to_string());
    }

    if uri.query().is_some_and(|q| !q.is_empty()) {
        return Query::<T>::try_from_uri(uri)
            .map(|Query(value)| value)
            .map_err(|e| e.body_text());
    }

    serde_json::from_value(Value::Null)
        .or_else(|_| serde_json::from_value(Value::Object(Default::default())))
        .map_err(|e| e.to_string())
}
