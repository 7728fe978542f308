//! `scopekit-auth`: bearer credential issue and verification.
//!
//! This crate is decoupled from HTTP: the API layer decides where tokens come
//! from and how failures are rendered.

pub mod claims;
pub mod credential;
pub mod exchange;
pub mod token;

pub use claims::{CredentialClaims, ISSUER, TokenError, validate_claims};
pub use credential::Credential;
pub use exchange::{CredentialProvider, ExchangeError, ProviderFn, StaticProvider, provider_fn};
pub use token::{CredentialService, CredentialVerifier};
