//! Per-request serial numbers.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

const SERIAL_PREFIX: &str = "SERIAL";
const SUFFIX_LEN: usize = 5;

/// Trace identifier attached to every response envelope.
///
/// Composed of the unix timestamp and a short random suffix. It is not unique
/// under load and must not be used as an idempotency or security token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialNum(String);

impl SerialNum {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{SERIAL_PREFIX}-{}-{suffix}", now.timestamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SerialNum {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SerialNum> for String {
    fn from(value: SerialNum) -> Self {
        value.0
    }
}
