use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use scopekit_auth::CredentialVerifier;
use scopekit_core::{CodedError, ErrorCode, SerialNum};

use crate::envelope::failure_response;

#[derive(Clone)]
pub struct CredentialState {
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl CredentialState {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

/// Verify the `Authorization` token and attach the [`scopekit_auth::Credential`]
/// to the request. Failures are answered with code `110004` and the route
/// handler never runs.
pub async fn credential_middleware(
    State(state): State<CredentialState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = extract_token(req.headers());

    match state.verifier.verify_at(token, Utc::now()) {
        Ok(credential) => {
            tracing::debug!(subject = %credential.subject, "credential verified");
            req.extensions_mut().insert(credential);
            next.run(req).await
        }
        Err(e) => {
            tracing::info!(error = %e, path = %req.uri().path(), "credential rejected");
            failure_response(
                SerialNum::generate(),
                CodedError::new(ErrorCode::TOKEN_VERIFY, e.to_string()),
            )
        }
    }
}

/// Raw header value, with an optional `Bearer ` prefix removed. A missing or
/// non-ASCII header yields the empty string, which fails verification.
fn extract_token(headers: &HeaderMap) -> &str {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn token_accepts_raw_and_bearer_forms() {
        assert_eq!(extract_token(&headers("abc.def.ghi")), "abc.def.ghi");
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")), "abc.def.ghi");
        assert_eq!(extract_token(&headers(" abc ")), "abc");
    }

    #[test]
    fn missing_header_is_empty() {
        assert_eq!(extract_token(&HeaderMap::new()), "");
    }
}
