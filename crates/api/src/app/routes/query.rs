use axum::routing::{MethodRouter, get};

use scopekit_infra::{Filter, Repository, ScopesParams, StoreError, Table};

use crate::context::RequestContext;
use crate::pipeline::wrap;

/// List rows of `T` filtered, ordered and paginated by a [`ScopesParams`] body.
pub fn query_route<T, S>(repository: Repository) -> MethodRouter<S>
where
    T: Table + 'static,
    S: Clone + Send + Sync + 'static,
{
    let endpoint = wrap(move |ctx: RequestContext<ScopesParams>| {
        let repository = repository.clone();
        async move { repository.list::<T>(&ctx.body).await }
    });

    get(endpoint.clone()).post(endpoint)
}

/// Like [`query_route`], answering with a [`scopekit_infra::Page`] that
/// includes the total match count.
pub fn query_page_route<T, S>(repository: Repository) -> MethodRouter<S>
where
    T: Table + 'static,
    S: Clone + Send + Sync + 'static,
{
    let endpoint = wrap(move |ctx: RequestContext<ScopesParams>| {
        let repository = repository.clone();
        async move { repository.page::<T>(&ctx.body).await }
    });

    get(endpoint.clone()).post(endpoint)
}

/// Fetch the first row of `T` whose primary key equals the `Resource` path
/// parameter. The key is converted to the column's own type, so `"42"` matches
/// both a `bigint` and a `text` key.
pub fn take_route<T, S>(repository: Repository) -> MethodRouter<S>
where
    T: Table + 'static,
    S: Clone + Send + Sync + 'static,
{
    let endpoint = wrap(move |ctx: RequestContext<()>| {
        let repository = repository.clone();
        async move {
            let id = ctx
                .resource
                .ok_or_else(|| StoreError::NotFound("missing Resource path parameter".into()))?;
            repository.take::<T>(&Filter::equals(T::PRIMARY_KEY, id)).await
        }
    });

    get(endpoint)
}
