use serde::{Deserialize, Serialize};

/// Identity recovered from a verified bearer token.
///
/// Reconstructed per request and never persisted. The default value (empty
/// strings, empty audience) is what handlers observe on unauthenticated routes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credential {
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub audience: Vec<String>,
}

impl Credential {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, audience: Vec<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            audience,
        }
    }

    /// True for the zero credential.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty() && self.subject.is_empty() && self.audience.is_empty()
    }
}
