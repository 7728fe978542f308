//! Typed get/set over the `key_values` table.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use scopekit_core::{decode, encode};

use crate::repository::{StoreError, Table, db_error};

pub const KEY_VALUE_TABLE: &str = "key_values";

/// One row of `key_values`. Soft-deleted rows keep their key reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct KeyValueRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub key: String,
    pub value: Json<Value>,
}

impl Table for KeyValueRecord {
    const TABLE: &'static str = KEY_VALUE_TABLE;
    const SOFT_DELETE: bool = true;
}

/// Postgres-backed string-keyed store of JSON values.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    pool: PgPool,
}

impl KeyValueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_values (
                id BIGSERIAL PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                deleted_at TIMESTAMPTZ NULL,
                key TEXT NOT NULL UNIQUE,
                value JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error("ensure_schema"))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_key_values_deleted_at ON key_values (deleted_at)")
            .execute(&self.pool)
            .await
            .map_err(db_error("ensure_schema"))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let text: Option<String> = sqlx::query_scalar(
            "SELECT value::text FROM key_values WHERE key = $1 AND deleted_at IS NULL",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("kv_get"))?;

        let text = text.ok_or_else(|| StoreError::NotFound(KEY_VALUE_TABLE.to_string()))?;
        Ok(decode(text.as_bytes())?)
    }

    /// Insert or overwrite `key`. A soft-deleted row for the same key is revived.
    #[tracing::instrument(skip(self, value))]
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let text = String::from_utf8(encode(value)?).map_err(|e| StoreError::Codec(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO key_values (key, value)
            VALUES ($1, $2::jsonb)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW(), deleted_at = NULL
            "#,
        )
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(db_error("kv_set"))?;

        Ok(())
    }

    /// Soft delete. Returns whether a live row was removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE key_values SET deleted_at = NOW(), updated_at = NOW() WHERE key = $1 AND deleted_at IS NULL",
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(db_error("kv_delete"))?;

        Ok(result.rows_affected() > 0)
    }
}
