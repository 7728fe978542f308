//! Generic list/take/update operations over `Table` records.

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use scopekit_core::{CodedError, ErrorCode};

use crate::scope::{
    Filter, Page, PaginationError, Scope, ScopesParams, WhereScope, column_name, quote_ident,
    push_value,
};

/// A record type stored in one table.
///
/// The serialized form of the record must use field names that map to the
/// table's columns through [`column_name`]; `update` relies on it. The field
/// holding [`Table::PRIMARY_KEY`] is matched ignoring ASCII case, so a record
/// serialized as `ID` still finds an `id` key.
pub trait Table: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Rows with a non-null `deleted_at` are invisible to reads.
    const SOFT_DELETE: bool = false;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found in {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidPagination(#[from] PaginationError),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("record encoding failed: {0}")]
    Codec(String),

    #[error("{table} record has no {key} field")]
    MissingPrimaryKey { table: &'static str, key: &'static str },

    #[error("{0}")]
    Transform(anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<scopekit_core::CodecError> for StoreError {
    fn from(value: scopekit_core::CodecError) -> Self {
        StoreError::Codec(value.to_string())
    }
}

impl From<StoreError> for CodedError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Transform(e) => CodedError::from(e),
            other => CodedError::new(ErrorCode::BIND, other.to_string()),
        }
    }
}

pub(crate) fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| StoreError::Database { operation, source }
}

fn select_from<'args, T: Table>() -> QueryBuilder<'args, Postgres> {
    QueryBuilder::new(format!("SELECT * FROM {}", quote_ident(T::TABLE)))
}

/// Query helpers over a Postgres pool.
///
/// Statements are independent: list+count and take+update are not atomic with
/// respect to concurrent writers.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// All rows matching the filters, in the requested order.
    #[tracing::instrument(skip(self, params), fields(table = T::TABLE))]
    pub async fn list<T: Table>(&self, params: &ScopesParams) -> Result<Vec<T>, StoreError> {
        let mut qb = select_from::<T>();
        params
            .where_scope()
            .live_only(T::SOFT_DELETE)
            .typed_by(T::TABLE)
            .apply(&mut qb);
        params.order_scope().apply(&mut qb);

        qb.build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list"))
    }

    /// One page of matches and the total count across all pages.
    #[tracing::instrument(skip(self, params), fields(table = T::TABLE))]
    pub async fn list_with_count<T: Table>(
        &self,
        params: &ScopesParams,
    ) -> Result<(Vec<T>, i64), StoreError> {
        let page = params.page_scope()?;
        let filters = params
            .where_scope()
            .live_only(T::SOFT_DELETE)
            .typed_by(T::TABLE);

        let mut count =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", quote_ident(T::TABLE)));
        filters.apply(&mut count);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count"))?;

        let mut qb = select_from::<T>();
        filters.apply(&mut qb);
        params.order_scope().apply(&mut qb);
        page.apply(&mut qb);
        let rows = qb
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_page"))?;

        Ok((rows, total))
    }

    pub async fn page<T: Table>(&self, params: &ScopesParams) -> Result<Page<T>, StoreError> {
        let (data, total) = self.list_with_count(params).await?;
        Ok(Page {
            page_size: params.pagination.page_size,
            page_index: params.pagination.page_index,
            total,
            data,
        })
    }

    /// First row matching `filter`.
    #[tracing::instrument(skip(self, filter), fields(table = T::TABLE, key = %filter.key))]
    pub async fn take<T: Table>(&self, filter: &Filter) -> Result<T, StoreError> {
        let mut qb = select_from::<T>();
        WhereScope::new(std::slice::from_ref(filter))
            .live_only(T::SOFT_DELETE)
            .typed_by(T::TABLE)
            .apply(&mut qb);
        qb.push(" LIMIT 1");

        qb.build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("take"))?
            .ok_or_else(|| StoreError::NotFound(T::TABLE.to_string()))
    }

    /// Load the row matching `filter`, transform it, and write back the
    /// columns whose serialized value changed.
    ///
    /// Read and write are separate statements; a concurrent update between
    /// them is overwritten.
    #[tracing::instrument(skip(self, filter, transform), fields(table = T::TABLE, key = %filter.key))]
    pub async fn update<T, F>(&self, filter: &Filter, transform: F) -> Result<T, StoreError>
    where
        T: Table,
        F: FnOnce(T) -> anyhow::Result<T>,
    {
        let record = self.take::<T>(filter).await?;
        let before = to_columns(&record, T::PRIMARY_KEY)?;
        let updated = transform(record).map_err(StoreError::Transform)?;
        let after = to_columns(&updated, T::PRIMARY_KEY)?;

        let key = before
            .get(T::PRIMARY_KEY)
            .cloned()
            .ok_or(StoreError::MissingPrimaryKey {
                table: T::TABLE,
                key: T::PRIMARY_KEY,
            })?;

        let changed: Map<String, Value> = after
            .into_iter()
            .filter(|(column, value)| column != T::PRIMARY_KEY && before.get(column) != Some(value))
            .collect();
        if changed.is_empty() {
            tracing::debug!("no columns changed");
            return Ok(updated);
        }

        let columns = changed
            .keys()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let table = quote_ident(T::TABLE);
        let pk = quote_ident(T::PRIMARY_KEY);

        // jsonb_populate_record converts each JSON value to the column's own type.
        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {table} SET ({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, "));
        push_value(&mut qb, &Value::Object(changed));
        qb.push(format!(")) WHERE {pk} = (SELECT {pk} FROM jsonb_populate_record(NULL::{table}, "));
        push_value(&mut qb, &Value::Object(Map::from_iter([(T::PRIMARY_KEY.to_string(), key)])));
        qb.push("))");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(db_error("update"))?;
        tracing::debug!(rows = result.rows_affected(), "updated");

        Ok(updated)
    }
}

/// Serialize a record into a column-name keyed JSON object.
fn to_columns<T: Serialize>(record: &T, primary_key: &str) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record).map_err(|e| StoreError::Codec(e.to_string()))? {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(field, value)| {
                let column = if field.eq_ignore_ascii_case(primary_key) {
                    primary_key.to_string()
                } else {
                    column_name(&field)
                };
                (column, value)
            })
            .collect()),
        other => Err(StoreError::Codec(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
