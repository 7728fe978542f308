use std::sync::Arc;

use axum::routing::{MethodRouter, get};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use scopekit_auth::{Credential, CredentialProvider, CredentialService};
use scopekit_core::{CodedError, ErrorCode};

use crate::context::RequestContext;
use crate::pipeline::wrap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    #[serde(alias = "Code")]
    pub code: String,
}

/// Exchange `{"code": ...}` for a signed token.
///
/// Codes: `110001` when the body does not bind, `110002` when the provider
/// rejects the code, `110003` when signing fails.
pub fn issue_route<S>(
    service: Arc<CredentialService>,
    provider: Arc<dyn CredentialProvider>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let endpoint = wrap(move |ctx: RequestContext<IssueRequest>| {
        let service = service.clone();
        let provider = provider.clone();
        async move {
            service
                .exchange(provider.as_ref(), &ctx.body.code)
                .await
        }
    })
    .with_bind_code(ErrorCode::CREDENTIAL_BIND);

    get(endpoint.clone()).post(endpoint)
}

/// Echo the credential attached by the middleware.
pub fn parse_route<S>() -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let endpoint = wrap(|ctx: RequestContext<Value>| async move {
        Ok::<Credential, CodedError>(ctx.credential)
    });

    get(endpoint.clone()).post(endpoint)
}
