//! Process-wide tracing setup.

mod subscriber;

pub use subscriber::{filter_for, init};
