//! HTTP surface: the request pipeline, response envelope, credential
//! middleware and application bootstrap.

pub mod app;
pub mod context;
pub mod envelope;
pub mod middleware;
pub mod pipeline;

pub use app::{AppState, Application, BootstrapError};
pub use context::RequestContext;
pub use envelope::{ResponseEnvelope, SUCCESS_MESSAGE, failure_response};
pub use middleware::{CredentialState, credential_middleware};
pub use pipeline::{Endpoint, Pipeline, RESOURCE_PARAM, wrap};
