//! Route builders. Each returns a `MethodRouter` wrapping typed handlers with
//! the request pipeline, so callers choose paths and middleware.

pub mod credential;
pub mod query;
pub mod system;

pub use credential::{IssueRequest, issue_route, parse_route};
pub use query::{query_page_route, query_route, take_route};
pub use system::health_route;
