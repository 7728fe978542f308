//! Wire shapes for filter, order and pagination descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Comparison applied by a [`Filter`].
///
/// Deserializes from the numeric code (`0..=8`) or the upper-case name. Anything
/// else becomes [`Action::Unrecognized`], and filters carrying it are skipped
/// when the query is built rather than rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawAction", into = "i64")]
pub enum Action {
    Like,
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Nin,
    Unrecognized,
}

impl Action {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Action::Like,
            1 => Action::Eq,
            2 => Action::Neq,
            3 => Action::Gt,
            4 => Action::Lt,
            5 => Action::Gte,
            6 => Action::Lte,
            7 => Action::In,
            8 => Action::Nin,
            _ => Action::Unrecognized,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "LIKE" => Action::Like,
            "EQ" => Action::Eq,
            "NEQ" => Action::Neq,
            "GT" => Action::Gt,
            "LT" => Action::Lt,
            "GTE" => Action::Gte,
            "LTE" => Action::Lte,
            "IN" => Action::In,
            "NIN" => Action::Nin,
            _ => Action::Unrecognized,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Action::Like => 0,
            Action::Eq => 1,
            Action::Neq => 2,
            Action::Gt => 3,
            Action::Lt => 4,
            Action::Gte => 5,
            Action::Lte => 6,
            Action::In => 7,
            Action::Nin => 8,
            Action::Unrecognized => -1,
        }
    }

    /// SQL operator for this action, `None` when unrecognized.
    pub fn operator(self) -> Option<&'static str> {
        Some(match self {
            Action::Like => "LIKE",
            Action::Eq => "=",
            Action::Neq => "!=",
            Action::Gt => ">",
            Action::Lt => "<",
            Action::Gte => ">=",
            Action::Lte => "<=",
            Action::In => "IN",
            Action::Nin => "NOT IN",
            Action::Unrecognized => return None,
        })
    }

    pub fn is_list(self) -> bool {
        matches!(self, Action::In | Action::Nin)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAction {
    Code(i64),
    Name(String),
    Other(Value),
}

impl From<RawAction> for Action {
    fn from(raw: RawAction) -> Self {
        match raw {
            RawAction::Code(code) => Action::from_code(code),
            RawAction::Name(name) => Action::from_name(&name),
            RawAction::Other(_) => Action::Unrecognized,
        }
    }
}

impl From<Action> for i64 {
    fn from(action: Action) -> Self {
        action.code()
    }
}

/// One restriction: `Key <Action> Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    pub key: String,
    pub action: Action,
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    pub fn new(key: impl Into<String>, action: Action, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            action,
            value: value.into(),
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, Action::Eq, value)
    }
}

/// Sort on one field, ascending unless `desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(rename = "Order")]
    pub field: String,
    #[serde(default)]
    pub desc: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            desc: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            desc: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid pagination: page_index={page_index}, page_size={page_size} (both must be >= 1)")]
pub struct PaginationError {
    pub page_index: i64,
    pub page_size: i64,
}

/// 1-based page request.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pagination {
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub page_index: i64,
}

impl Pagination {
    pub fn new(page_index: i64, page_size: i64) -> Self {
        Self {
            page_size,
            page_index,
        }
    }

    /// Rows skipped before this page: `(page_index - 1) * page_size`.
    ///
    /// Unchecked; see [`Pagination::validate`].
    pub fn offset(&self) -> i64 {
        self.page_index.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn validate(&self) -> Result<(), PaginationError> {
        if self.page_index < 1 || self.page_size < 1 {
            return Err(PaginationError {
                page_index: self.page_index,
                page_size: self.page_size,
            });
        }
        Ok(())
    }
}

/// Filters, orders and pagination from a request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScopesParams {
    pub filters: Vec<Filter>,
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page<T> {
    pub page_size: i64,
    pub page_index: i64,
    pub total: i64,
    pub data: Vec<T>,
}
