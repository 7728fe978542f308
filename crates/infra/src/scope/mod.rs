//! Declarative filter, order and page descriptors turned into SQL clauses.

mod builder;
mod column;
mod params;

pub(crate) use builder::push_value;
pub use builder::{OrderScope, PageScope, Scope, WhereScope};
pub use column::{column_name, quote_ident};
pub use params::{Action, Filter, Order, Page, Pagination, PaginationError, ScopesParams};
