//! Structured application error codes.
//!
//! Every failure that reaches a client is a `(code, message)` pair. Inside the
//! process it travels as a [`CodedError`]; errors from elsewhere may carry a code
//! in their text using the `[<digits>]: <message>` convention, which
//! [`CodedError::from_text`] understands.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved response codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(i64);

impl ErrorCode {
    /// Success.
    pub const OK: ErrorCode = ErrorCode(0);
    /// Request body could not be bound; also the fallback for uncoded errors.
    pub const BIND: ErrorCode = ErrorCode(100_000);
    /// Token could not be parsed into claims.
    pub const TOKEN_PARSE: ErrorCode = ErrorCode(110_000);
    /// Credential exchange request could not be bound.
    pub const CREDENTIAL_BIND: ErrorCode = ErrorCode(110_001);
    /// Exchange code was rejected by the credential provider.
    pub const CREDENTIAL_LOOKUP: ErrorCode = ErrorCode(110_002);
    /// Token could not be signed.
    pub const TOKEN_ISSUE: ErrorCode = ErrorCode(110_003);
    /// Bearer token failed verification.
    pub const TOKEN_VERIFY: ErrorCode = ErrorCode(110_004);

    pub const fn new(code: i64) -> Self {
        Self(code)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<ErrorCode> for i64 {
    fn from(value: ErrorCode) -> Self {
        value.0
    }
}

static CODED_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d+)\]: (.+)$").expect("static pattern is valid")
});

/// An error carrying a numeric response code.
///
/// `Display` renders the wire convention `[code]: message`, so a `CodedError`
/// that is flattened into a string by some intermediate layer can still be
/// recovered with [`CodedError::from_text`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("[{code}]: {message}")]
pub struct CodedError {
    code: ErrorCode,
    message: String,
}

impl CodedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error with the generic fallback code.
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BIND, message)
    }

    /// Recover a code from error text.
    ///
    /// Text matching `[<digits>]: <message>` yields that code and the remainder.
    /// A code that does not fit in an `i64` falls back to [`ErrorCode::BIND`] with
    /// the remainder; any other text falls back to [`ErrorCode::BIND`] with the
    /// full text.
    pub fn from_text(text: &str) -> Self {
        let Some(caps) = CODED_TEXT.captures(text) else {
            return Self::uncoded(text);
        };
        let message = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let code = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(ErrorCode::new)
            .unwrap_or(ErrorCode::BIND);
        Self::new(code, message)
    }

    /// Map any error through its `Display` text.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::from_text(&err.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_parts(self) -> (ErrorCode, String) {
        (self.code, self.message)
    }
}

impl From<anyhow::Error> for CodedError {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast_ref::<CodedError>() {
            Some(coded) => coded.clone(),
            None => Self::from_text(&value.to_string()),
        }
    }
}

impl From<String> for CodedError {
    fn from(value: String) -> Self {
        Self::from_text(&value)
    }
}

impl From<&str> for CodedError {
    fn from(value: &str) -> Self {
        Self::from_text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coded_text_yields_code_and_message() {
        let err = CodedError::from_text("[110002]: lookup failed");
        assert_eq!(err.code(), ErrorCode::CREDENTIAL_LOOKUP);
        assert_eq!(err.message(), "lookup failed");
    }

    #[test]
    fn plain_text_falls_back_to_bind_code() {
        let err = CodedError::from_text("boom");
        assert_eq!(err.code(), ErrorCode::BIND);
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn overflowing_code_falls_back_but_keeps_message() {
        let err = CodedError::from_text("[99999999999999999999999]: too big");
        assert_eq!(err.code(), ErrorCode::BIND);
        assert_eq!(err.message(), "too big");
    }

    #[test]
    fn missing_separator_is_not_coded() {
        let err = CodedError::from_text("[42] no colon");
        assert_eq!(err.code(), ErrorCode::BIND);
        assert_eq!(err.message(), "[42] no colon");
    }

    #[test]
    fn display_round_trips_through_text() {
        let original = CodedError::new(ErrorCode::new(42), "answer");
        assert_eq!(original.to_string(), "[42]: answer");
        assert_eq!(CodedError::from_text(&original.to_string()), original);
    }

    #[test]
    fn from_error_uses_display_text() {
        let io = std::io::Error::other("[7]: disk gone");
        let err = CodedError::from_error(&io);
        assert_eq!(err.into_parts(), (ErrorCode::new(7), "disk gone".to_string()));
    }

    #[test]
    fn anyhow_errors_keep_their_code() {
        let err = anyhow::Error::new(CodedError::new(ErrorCode::TOKEN_ISSUE, "signing failed"));
        assert_eq!(CodedError::from(err).code(), ErrorCode::TOKEN_ISSUE);

        let plain = anyhow::anyhow!("[110003]: signing failed");
        assert_eq!(CodedError::from(plain).code(), ErrorCode::TOKEN_ISSUE);
    }
}
