//! Exchange of an opaque code for a credential.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use scopekit_core::{CodecError, CodedError, ErrorCode, decode};

use crate::{Credential, TokenError};

/// Caller-supplied lookup from an exchange code to a credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn lookup(&self, code: &str) -> anyhow::Result<Credential>;
}

#[async_trait]
impl<P> CredentialProvider for std::sync::Arc<P>
where
    P: CredentialProvider + ?Sized,
{
    async fn lookup(&self, code: &str) -> anyhow::Result<Credential> {
        (**self).lookup(code).await
    }
}

/// Adapter for synchronous closures.
#[derive(Debug, Clone)]
pub struct ProviderFn<F>(pub F);

pub fn provider_fn<F>(f: F) -> ProviderFn<F>
where
    F: Fn(&str) -> anyhow::Result<Credential> + Send + Sync,
{
    ProviderFn(f)
}

#[async_trait]
impl<F> CredentialProvider for ProviderFn<F>
where
    F: Fn(&str) -> anyhow::Result<Credential> + Send + Sync,
{
    async fn lookup(&self, code: &str) -> anyhow::Result<Credential> {
        (self.0)(code)
    }
}

/// Fixed table of exchange codes.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    codes: HashMap<String, Credential>,
}

impl StaticProvider {
    pub fn new(codes: HashMap<String, Credential>) -> Self {
        Self { codes }
    }

    /// Parse a JSON object mapping codes to credentials.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        Ok(Self::new(decode(json.as_bytes())?))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for StaticProvider {
    async fn lookup(&self, code: &str) -> anyhow::Result<Credential> {
        self.codes
            .get(code)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown exchange code"))
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{0}")]
    Lookup(anyhow::Error),

    #[error(transparent)]
    Issue(TokenError),
}

impl From<ExchangeError> for CodedError {
    fn from(value: ExchangeError) -> Self {
        match value {
            ExchangeError::Lookup(e) => CodedError::new(ErrorCode::CREDENTIAL_LOOKUP, e.to_string()),
            ExchangeError::Issue(e) => CodedError::new(ErrorCode::TOKEN_ISSUE, e.to_string()),
        }
    }
}
