//! Composable clauses over a Postgres `QueryBuilder`.
//!
//! Identifiers are always quoted and values always bound, so nothing from a
//! request body is ever spliced into SQL text.

use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use super::column::{column_name, quote_ident};
use super::params::{Action, Filter, Order, Pagination, PaginationError, ScopesParams};

/// A restriction appended to a statement under construction.
pub trait Scope {
    fn apply<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>);
}

/// `WHERE` clause built from filters, conjoined in order.
#[derive(Debug, Clone, Copy)]
pub struct WhereScope<'a> {
    filters: &'a [Filter],
    live_only: bool,
    table: Option<&'a str>,
}

impl<'a> WhereScope<'a> {
    pub fn new(filters: &'a [Filter]) -> Self {
        Self {
            filters,
            live_only: false,
            table: None,
        }
    }

    /// Convert each value to its column's declared type in `table`.
    ///
    /// Values are shipped as JSONB and read back through
    /// `jsonb_populate_record(NULL::table, ..)`, so an RFC 3339 string compares
    /// against a `timestamptz` column and `"12345"` against a text key. Without
    /// a table, values bind with the type of their JSON representation.
    pub fn typed_by(mut self, table: &'a str) -> Self {
        self.table = Some(table);
        self
    }

    /// Also require `deleted_at IS NULL`.
    pub fn live_only(mut self, live_only: bool) -> Self {
        self.live_only = live_only;
        self
    }
}

impl Scope for WhereScope<'_> {
    fn apply<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        let mut first = true;
        let mut next_clause = |qb: &mut QueryBuilder<'args, Postgres>| {
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if self.live_only {
            next_clause(qb);
            qb.push("\"deleted_at\" IS NULL");
        }

        for filter in self.filters {
            let Some(op) = filter.action.operator() else {
                tracing::debug!(key = %filter.key, "skipping filter with unrecognized action");
                continue;
            };
            next_clause(qb);
            push_predicate(qb, filter, op, self.table);
        }
    }
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter, op: &str, table: Option<&str>) {
    let name = column_name(&filter.key);
    let column = quote_ident(&name);

    if filter.action.is_list() {
        let items = match &filter.value {
            Value::Array(items) => items.as_slice(),
            scalar => std::slice::from_ref(scalar),
        };
        if items.is_empty() {
            qb.push(if filter.action == Action::In { "FALSE" } else { "TRUE" });
            return;
        }
        qb.push(column).push(" ").push(op).push(" (");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_operand(qb, table, &name, item);
        }
        qb.push(")");
        return;
    }

    match (filter.action, &filter.value) {
        (Action::Eq, Value::Null) => {
            qb.push(column).push(" IS NULL");
        }
        (Action::Neq, Value::Null) => {
            qb.push(column).push(" IS NOT NULL");
        }
        (_, value) => {
            qb.push(column).push(" ").push(op).push(" ");
            push_operand(qb, table, &name, value);
        }
    }
}

fn push_operand(qb: &mut QueryBuilder<'_, Postgres>, table: Option<&str>, column: &str, value: &Value) {
    let Some(table) = table else {
        push_value(qb, value);
        return;
    };
    qb.push("(SELECT ")
        .push(quote_ident(column))
        .push(" FROM jsonb_populate_record(NULL::")
        .push(quote_ident(table))
        .push(", ");
    qb.push_bind(Json(Value::Object(Map::from_iter([(
        column.to_string(),
        value.clone(),
    )]))));
    qb.push("))");
}

/// Bind a JSON value with the closest Postgres type.
pub(crate) fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Null => qb.push_bind(None::<String>),
        Value::Bool(b) => qb.push_bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => qb.push_bind(i),
            None => qb.push_bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => qb.push_bind(s.clone()),
        other => qb.push_bind(Json(other.clone())),
    };
}

/// `ORDER BY` clause, first order is the primary key of the sort.
#[derive(Debug, Clone, Copy)]
pub struct OrderScope<'a>(pub &'a [Order]);

impl Scope for OrderScope<'_> {
    fn apply<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        for (i, order) in self.0.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(quote_ident(&column_name(&order.field)));
            if order.desc {
                qb.push(" DESC");
            }
        }
    }
}

/// `LIMIT`/`OFFSET` for a validated page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageScope {
    limit: i64,
    offset: i64,
}

impl PageScope {
    pub fn new(pagination: Pagination) -> Result<Self, PaginationError> {
        pagination.validate()?;
        Ok(Self {
            limit: pagination.page_size,
            offset: pagination.offset(),
        })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Scope for PageScope {
    fn apply<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        qb.push(" LIMIT ").push_bind(self.limit);
        qb.push(" OFFSET ").push_bind(self.offset);
    }
}

impl ScopesParams {
    pub fn where_scope(&self) -> WhereScope<'_> {
        WhereScope::new(&self.filters)
    }

    pub fn order_scope(&self) -> OrderScope<'_> {
        OrderScope(&self.orders)
    }

    pub fn page_scope(&self) -> Result<PageScope, PaginationError> {
        PageScope::new(self.pagination)
    }
}
