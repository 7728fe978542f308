//! Application configuration from `SCOPEKIT_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose application logs and SQL statements.
    #[default]
    Debug,
    /// Info and above, SQL statements silenced.
    Product,
}

impl LogLevel {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Product => "info,sqlx=warn",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "0" => Ok(LogLevel::Debug),
            "product" | "production" | "1" => Ok(LogLevel::Product),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; overrides the individual parts when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".into(),
            port: 5432,
            name: "scopekit".into(),
            username: "postgres".into(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in the in-memory cache.
    pub size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { size: 1024 }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub secret: String,
    pub ttl_secs: u64,
}

impl core::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.into(),
            ttl_secs: 3600,
        }
    }
}

impl CredentialConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub log: LogConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub credential: CredentialConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(level) = lookup("SCOPEKIT_LOG_LEVEL") {
            config.log.level = level.parse().map_err(|_| ConfigError::Invalid {
                key: "SCOPEKIT_LOG_LEVEL",
                value: level,
            })?;
        }

        let db = &mut config.database;
        db.url = lookup("DATABASE_URL");
        set_string(&lookup, "SCOPEKIT_DB_HOST", &mut db.host);
        set_parsed(&lookup, "SCOPEKIT_DB_PORT", &mut db.port)?;
        set_string(&lookup, "SCOPEKIT_DB_NAME", &mut db.name);
        set_string(&lookup, "SCOPEKIT_DB_USER", &mut db.username);
        set_string(&lookup, "SCOPEKIT_DB_PASSWORD", &mut db.password);

        set_string(&lookup, "SCOPEKIT_SERVER_HOST", &mut config.server.host);
        set_parsed(&lookup, "SCOPEKIT_SERVER_PORT", &mut config.server.port)?;
        set_parsed(&lookup, "SCOPEKIT_CACHE_SIZE", &mut config.cache.size)?;
        if config.cache.size == 0 {
            return Err(ConfigError::Invalid {
                key: "SCOPEKIT_CACHE_SIZE",
                value: "0".into(),
            });
        }

        if let Some(secret) = lookup("SCOPEKIT_JWT_SECRET").filter(|s| !s.is_empty()) {
            config.credential.secret = secret;
        }
        set_parsed(&lookup, "SCOPEKIT_JWT_TTL_SECS", &mut config.credential.ttl_secs)?;

        Ok(config)
    }

    /// True while the signing secret is still the built-in development value.
    pub fn uses_dev_secret(&self) -> bool {
        self.credential.secret == DEV_SECRET
    }

    pub fn database_url(&self) -> String {
        let db = &self.database;
        if let Some(url) = &db.url {
            return url.clone();
        }
        if db.password.is_empty() {
            format!("postgres://{}@{}:{}/{}", db.username, db.host, db.port, db.name)
        } else {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                db.username, db.password, db.host, db.port, db.name
            )
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn set_string<F>(lookup: &F, key: &'static str, slot: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *slot = value;
    }
}

fn set_parsed<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        *slot = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value })?;
    }
    Ok(())
}
