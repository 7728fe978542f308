//! HS256 credential tokens keyed by a single shared secret.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{CredentialClaims, ISSUER, TokenError, validate_claims};
use crate::exchange::{CredentialProvider, ExchangeError};
use crate::Credential;

/// Verifies bearer tokens into credentials.
///
/// The API middleware holds this as `Arc<dyn CredentialVerifier>`.
pub trait CredentialVerifier: Send + Sync {
    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Credential, TokenError>;
}

/// Issues and verifies credential tokens.
///
/// There is exactly one key in play; no rotation and no key ids.
#[derive(Clone)]
pub struct CredentialService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl core::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();

        // Time checks are done by `validate_claims` against an explicit `now`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_issuer(&[ISSUER]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn issue(&self, credential: &Credential) -> Result<String, TokenError> {
        self.issue_at(credential, Utc::now())
    }

    /// Sign a token valid from `now` until `now + ttl`.
    pub fn issue_at(&self, credential: &Credential, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = CredentialClaims::new(credential, now, expires_at);

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Sign(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Credential, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Look up `code` through `provider` and sign a token for the result.
    #[tracing::instrument(skip(self, provider, code), err)]
    pub async fn exchange<P>(&self, provider: &P, code: &str) -> Result<String, ExchangeError>
    where
        P: CredentialProvider + ?Sized,
    {
        let credential = provider.lookup(code).await.map_err(ExchangeError::Lookup)?;
        self.issue(&credential).map_err(ExchangeError::Issue)
    }

    fn decode(&self, token: &str) -> Result<CredentialClaims, TokenError> {
        jsonwebtoken::decode::<CredentialClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
                ErrorKind::InvalidToken
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed(e.to_string()),
                _ => TokenError::Parse,
            })
    }
}

impl CredentialVerifier for CredentialService {
    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Credential, TokenError> {
        let claims = self.decode(token)?;
        validate_claims(&claims, now)?;
        Ok(claims.into_credential())
    }
}
