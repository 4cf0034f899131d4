//! Action capabilities
//!
//! A view is any type implementing one or more of these traits. Each trait is one CRUD
//! capability; the viewset builder turns each into a route. Request parts are decoded
//! into the associated types before the action runs, so a malformed id, query or body
//! never reaches the action.
//!
//! Actions fail with `anyhow::Error`. Return an [`ApiError`](crate::problem::ApiError)
//! (or `Err(ApiError::…)?`) to pick the response; error types registered on the
//! [`ErrorRegistry`](crate::problem::ErrorRegistry) get their mapped status; anything
//! else becomes a 500.
//!
//! The `Blocking*` traits are the same capabilities for synchronous code. Wrap such a
//! view in [`Blocking`] to run each call on the blocking thread pool.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::context::ViewContext;

/// Query string of actions that take none
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoParams {}

/// Collection read
pub trait ListAction: Send + Sync + 'static {
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn list(
        &self,
        ctx: &mut ViewContext,
        query: Self::Query,
    ) -> impl Future<Output = anyhow::Result<Self::Output>> + Send;
}

/// Single-instance read; `None` means "not found"
pub trait RetrieveAction: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn retrieve(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        query: Self::Query,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Output>>> + Send;
}

/// Insert
pub trait CreateAction: Send + Sync + 'static {
    type Body: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn create(
        &self,
        ctx: &mut ViewContext,
        body: Self::Body,
        query: Self::Query,
    ) -> impl Future<Output = anyhow::Result<Self::Output>> + Send;
}

/// Full replacement; `None` means "not found"
pub trait UpdateAction: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Body: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn update(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        body: Self::Body,
        query: Self::Query,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Output>>> + Send;
}

/// Merge of the fields the client sent; `None` means "not found"
pub trait PartialUpdateAction: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Body: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn partial_update(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        body: Self::Body,
        query: Self::Query,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Output>>> + Send;
}

/// Delete
pub trait DestroyAction: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;

    fn destroy(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        query: Self::Query,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

pub trait BlockingList: Send + Sync + 'static {
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn list(&self, ctx: &mut ViewContext, query: Self::Query) -> anyhow::Result<Self::Output>;
}

pub trait BlockingRetrieve: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn retrieve(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        query: Self::Query,
    ) -> anyhow::Result<Option<Self::Output>>;
}

pub trait BlockingCreate: Send + Sync + 'static {
    type Body: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn create(
        &self,
        ctx: &mut ViewContext,
        body: Self::Body,
        query: Self::Query,
    ) -> anyhow::Result<Self::Output>;
}

pub trait BlockingUpdate: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Body: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn update(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        body: Self::Body,
        query: Self::Query,
    ) -> anyhow::Result<Option<Self::Output>>;
}

pub trait BlockingPartialUpdate: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Body: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn partial_update(
        &self,
        ctx: &mut ViewContext,
        id: Self::Id,
        body: Self::Body,
        query: Self::Query,
    ) -> anyhow::Result<Option<Self::Output>>;
}

pub trait BlockingDestroy: Send + Sync + 'static {
    type Id: DeserializeOwned + Send + 'static;
    type Query: DeserializeOwned + Send + 'static;

    fn destroy(&self, ctx: &mut ViewContext, id: Self::Id, query: Self::Query)
        -> anyhow::Result<()>;
}

/// Runs a synchronous view on tokio's blocking pool
///
/// ```rust,ignore
/// let viewset = Viewset::builder(config).list(Arc::new(Blocking::new(SqliteItems::open()?)));
/// ```
#[derive(Debug)]
pub struct Blocking<V>(Arc<V>);

impl<V> Blocking<V> {
    pub fn new(view: V) -> Self {
        Self(Arc::new(view))
    }

    /// Shares an existing view
    pub fn from_arc(view: Arc<V>) -> Self {
        Self(view)
    }

    /// The wrapped value
    #[must_use]
    pub fn inner(&self) -> &Arc<V> {
        &self.0
    }
}

impl<V> Clone for Blocking<V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Move a copy of the context onto the blocking pool, run `f`, then write the copy back
/// so status and header changes survive
async fn run_blocking<T, F>(ctx: &mut ViewContext, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut ViewContext) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let mut owned = ctx.clone();
    let (result, owned) = tokio::task::spawn_blocking(move || {
        let result = f(&mut owned);
        (result, owned)
    })
    .await
    .map_err(|e| anyhow::anyhow!("blocking action did not complete: {e}"))?;
    *ctx = owned;
    result
}

impl<V: BlockingList> ListAction for Blocking<V> {
    type Query = V::Query;
    type Output = V::Output;

    async fn list(&self, ctx: &mut ViewContext, query: V::Query) -> anyhow::Result<V::Output> {
        let view = Arc::clone(&self.0);
        run_blocking(ctx, move |ctx| view.list(ctx, query)).await
    }
}

impl<V: BlockingRetrieve> RetrieveAction for Blocking<V> {
    type Id = V::Id;
    type Query = V::Query;
    type Output = V::Output;

    async fn retrieve(
        &self,
        ctx: &mut ViewContext,
        id: V::Id,
        query: V::Query,
    ) -> anyhow::Result<Option<V::Output>> {
        let view = Arc::clone(&self.0);
        run_blocking(ctx, move |ctx| view.retrieve(ctx, id, query)).await
    }
}

impl<V: BlockingCreate> CreateAction for Blocking<V> {
    type Body = V::Body;
    type Query = V::Query;
    type Output = V::Output;

    async fn create(
        &self,
        ctx: &mut ViewContext,
        body: V::Body,
        query: V::Query,
    ) -> anyhow::Result<V::Output> {
        let view = Arc::clone(&self.0);
        run_blocking(ctx, move |ctx| view.create(ctx, body, query)).await
    }
}

impl<V: BlockingUpdate> UpdateAction for Blocking<V> {
    type Id = V::Id;
    type Body = V::Body;
    type Query = V::Query;
    type Output = V::Output;

    async fn update(
        &self,
        ctx: &mut ViewContext,
        id: V::Id,
        body: V::Body,
        query: V::Query,
    ) -> anyhow::Result<Option<V::Output>> {
        let view = Arc::clone(&self.0);
        run_blocking(ctx, move |ctx| view.update(ctx, id, body, query)).await
    }
}

impl<V: BlockingPartialUpdate> PartialUpdateAction for Blocking<V> {
    type Id = V::Id;
    type Body = V::Body;
    type Query = V::Query;
    type Output = V::Output;

    async fn partial_update(
        &self,
        ctx: &mut ViewContext,
        id: V::Id,
        body: V::Body,
        query: V::Query,
    ) -> anyhow::Result<Option<V::Output>> {
        let view = Arc::clone(&self.0);
        run_blocking(ctx, move |ctx| view.partial_update(ctx, id, body, query)).await
    }
}

impl<V: BlockingDestroy> DestroyAction for Blocking<V> {
    type Id = V::Id;
    type Query = V::Query;

    async fn destroy(&self, ctx: &mut ViewContext, id: V::Id, query: V::Query) -> anyhow::Result<()> {
        let view = Arc::clone(&self.0);
        run_blocking(ctx, move |ctx| view.destroy(ctx, id, query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, StatusCode};

    struct Counter;

    impl BlockingList for Counter {
        type Query = NoParams;
        type Output = Vec<u32>;

        fn list(&self, ctx: &mut ViewContext, _query: NoParams) -> anyhow::Result<Vec<u32>> {
            ctx.set_status(StatusCode::PARTIAL_CONTENT);
            Ok(vec![1, 2, 3])
        }
    }

    struct Failing;

    impl BlockingDestroy for Failing {
        type Id = u32;
        type Query = NoParams;

        fn destroy(&self, _ctx: &mut ViewContext, id: u32, _query: NoParams) -> anyhow::Result<()> {
            anyhow::bail!("cannot delete {id}")
        }
    }

    #[tokio::test]
    async fn test_blocking_list_keeps_context_changes() {
        let view = Blocking::new(Counter);
        let mut ctx = ViewContext::new(Method::GET, "/counters", HeaderMap::new());

        let out = ListAction::list(&view, &mut ctx, NoParams {}).await.unwrap();
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(ctx.status(), Some(StatusCode::PARTIAL_CONTENT));
    }

    #[tokio::test]
    async fn test_blocking_errors_propagate() {
        let view = Blocking::new(Failing);
        let mut ctx = ViewContext::new(Method::DELETE, "/x/7", HeaderMap::new());

        let err = DestroyAction::destroy(&view, &mut ctx, 7, NoParams {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot delete 7");
    }
}
