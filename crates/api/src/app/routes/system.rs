use axum::routing::{MethodRouter, get};
use scopekit_core::CodedError;

use crate::context::RequestContext;
use crate::pipeline::wrap;

/// Liveness check answered through the pipeline, so it carries an envelope.
pub fn health_route<S>() -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(wrap(|_: RequestContext<()>| async {
        Ok::<_, CodedError>("Health")
    }))
}
