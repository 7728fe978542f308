use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use scopekit_core::{CodedError, ErrorCode};

use crate::Credential;

/// Issuer written into every token this crate signs.
pub const ISSUER: &str = "JwtUtil";

/// Registered JWT claims carried by a credential token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub iss: String,

    #[serde(default)]
    pub sub: String,

    /// Audience list. Accepts a bare string on input, as RFC 7519 allows.
    #[serde(default, deserialize_with = "one_or_many")]
    pub aud: Vec<String>,

    /// Expiration, unix seconds.
    pub exp: i64,

    /// Issued-at, unix seconds.
    pub iat: i64,

    #[serde(default)]
    pub jti: String,
}

impl CredentialClaims {
    pub fn new(credential: &Credential, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            iss: ISSUER.to_string(),
            sub: credential.subject.clone(),
            aud: credential.audience.clone(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: credential.id.clone(),
        }
    }

    pub fn into_credential(self) -> Credential {
        Credential {
            id: self.jti,
            subject: self.sub,
            audience: self.aud,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("unexpected token issuer")]
    InvalidIssuer,

    #[error("[110000]: parse token fail")]
    Parse,

    #[error("token signing failed: {0}")]
    Sign(String),
}

impl From<TokenError> for CodedError {
    fn from(value: TokenError) -> Self {
        let code = match value {
            TokenError::Sign(_) => ErrorCode::TOKEN_ISSUE,
            _ => ErrorCode::TOKEN_VERIFY,
        };
        CodedError::new(code, value.to_string())
    }
}

/// Validate the time window of decoded claims against `now`.
///
/// No leeway is applied. Signature checks happen before this is called.
pub fn validate_claims(claims: &CredentialClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
