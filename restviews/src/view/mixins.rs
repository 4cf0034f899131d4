//! One route provider per action capability

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    routing::{self, MethodRouter},
    Json,
};

use crate::error::Result;
use crate::route::{Action, RouteDescriptor};

use super::actions::{
    CreateAction, DestroyAction, ListAction, PartialUpdateAction, RetrieveAction, UpdateAction,
};
use super::context::ViewContext;
use super::dispatch::{RouteScope, Source};

/// Something that contributes routes to a viewset
pub trait RouteProvider: Send + Sync {
    /// The CRUD action provided, if any
    fn action(&self) -> Option<Action>;

    /// Resolve the provided routes under a scope
    ///
    /// # Errors
    ///
    /// The route cannot be built (e.g. an invalid path template).
    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>>;
}

macro_rules! decode {
    ($dispatcher:ident, $ctx:ident, $part:expr, $source:expr) => {
        match $part {
            Ok(value) => value.0,
            Err(rejection) => return $dispatcher.reject(&$ctx, $source, rejection),
        }
    };
}

pub(crate) struct ListMixin<V>(pub(crate) Arc<V>);

impl<V: ListAction> RouteProvider for ListMixin<V> {
    fn action(&self) -> Option<Action> {
        Some(Action::List)
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let view = Arc::clone(&self.0);
        let dispatcher = scope.action_dispatcher(Action::List);
        let handler: MethodRouter = routing::get(
            move |mut ctx: ViewContext, query: std::result::Result<Query<V::Query>, QueryRejection>| {
                let view = Arc::clone(&view);
                let dispatcher = dispatcher.clone();
                async move {
                    let query = decode!(dispatcher, ctx, query, Source::Query);
                    match view.list(&mut ctx, query).await {
                        Ok(items) => dispatcher.ok(ctx, &items),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            },
        );
        Ok(vec![scope.describe_action(Action::List, handler)?])
    }
}

pub(crate) struct RetrieveMixin<V>(pub(crate) Arc<V>);

impl<V: RetrieveAction> RouteProvider for RetrieveMixin<V> {
    fn action(&self) -> Option<Action> {
        Some(Action::Retrieve)
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let view = Arc::clone(&self.0);
        let dispatcher = scope.action_dispatcher(Action::Retrieve);
        let handler: MethodRouter = routing::get(
            move |mut ctx: ViewContext,
                  id: std::result::Result<Path<V::Id>, PathRejection>,
                  query: std::result::Result<Query<V::Query>, QueryRejection>| {
                let view = Arc::clone(&view);
                let dispatcher = dispatcher.clone();
                async move {
                    let id = decode!(dispatcher, ctx, id, Source::Path);
                    let query = decode!(dispatcher, ctx, query, Source::Query);
                    match view.retrieve(&mut ctx, id, query).await {
                        Ok(found) => dispatcher.ok_or_not_found(ctx, found),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            },
        );
        Ok(vec![scope.describe_action(Action::Retrieve, handler)?])
    }
}

pub(crate) struct CreateMixin<V>(pub(crate) Arc<V>);

impl<V: CreateAction> RouteProvider for CreateMixin<V> {
    fn action(&self) -> Option<Action> {
        Some(Action::Create)
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let view = Arc::clone(&self.0);
        let dispatcher = scope.action_dispatcher(Action::Create);
        let handler: MethodRouter = routing::post(
            move |mut ctx: ViewContext,
                  query: std::result::Result<Query<V::Query>, QueryRejection>,
                  body: std::result::Result<Json<V::Body>, JsonRejection>| {
                let view = Arc::clone(&view);
                let dispatcher = dispatcher.clone();
                async move {
                    let query = decode!(dispatcher, ctx, query, Source::Query);
                    let body = decode!(dispatcher, ctx, body, Source::Body);
                    match view.create(&mut ctx, body, query).await {
                        Ok(_) if !dispatcher.config().return_on_create => dispatcher.empty(ctx),
                        Ok(created) => dispatcher.ok(ctx, &created),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            },
        );
        Ok(vec![scope.describe_action(Action::Create, handler)?])
    }
}

pub(crate) struct UpdateMixin<V>(pub(crate) Arc<V>);

impl<V: UpdateAction> RouteProvider for UpdateMixin<V> {
    fn action(&self) -> Option<Action> {
        Some(Action::Update)
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let view = Arc::clone(&self.0);
        let dispatcher = scope.action_dispatcher(Action::Update);
        let handler: MethodRouter = routing::put(
            move |mut ctx: ViewContext,
                  id: std::result::Result<Path<V::Id>, PathRejection>,
                  query: std::result::Result<Query<V::Query>, QueryRejection>,
                  body: std::result::Result<Json<V::Body>, JsonRejection>| {
                let view = Arc::clone(&view);
                let dispatcher = dispatcher.clone();
                async move {
                    let id = decode!(dispatcher, ctx, id, Source::Path);
                    let query = decode!(dispatcher, ctx, query, Source::Query);
                    let body = decode!(dispatcher, ctx, body, Source::Body);
                    match view.update(&mut ctx, id, body, query).await {
                        Ok(None) if dispatcher.config().raise_on_none => dispatcher.not_found(&ctx),
                        Ok(_) if !dispatcher.config().return_on_update => dispatcher.empty(ctx),
                        Ok(updated) => dispatcher.ok_or_not_found(ctx, updated),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            },
        );
        Ok(vec![scope.describe_action(Action::Update, handler)?])
    }
}

pub(crate) struct PartialUpdateMixin<V>(pub(crate) Arc<V>);

impl<V: PartialUpdateAction> RouteProvider for PartialUpdateMixin<V> {
    fn action(&self) -> Option<Action> {
        Some(Action::PartialUpdate)
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let view = Arc::clone(&self.0);
        let dispatcher = scope.action_dispatcher(Action::PartialUpdate);
        let handler: MethodRouter = routing::patch(
            move |mut ctx: ViewContext,
                  id: std::result::Result<Path<V::Id>, PathRejection>,
                  query: std::result::Result<Query<V::Query>, QueryRejection>,
                  body: std::result::Result<Json<V::Body>, JsonRejection>| {
                let view = Arc::clone(&view);
                let dispatcher = dispatcher.clone();
                async move {
                    let id = decode!(dispatcher, ctx, id, Source::Path);
                    let query = decode!(dispatcher, ctx, query, Source::Query);
                    let body = decode!(dispatcher, ctx, body, Source::Body);
                    match view.partial_update(&mut ctx, id, body, query).await {
                        Ok(None) if dispatcher.config().raise_on_none => dispatcher.not_found(&ctx),
                        Ok(_) if !dispatcher.config().return_on_update => dispatcher.empty(ctx),
                        Ok(updated) => dispatcher.ok_or_not_found(ctx, updated),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            },
        );
        Ok(vec![scope.describe_action(Action::PartialUpdate, handler)?])
    }
}

pub(crate) struct DestroyMixin<V>(pub(crate) Arc<V>);

impl<V: DestroyAction> RouteProvider for DestroyMixin<V> {
    fn action(&self) -> Option<Action> {
        Some(Action::Destroy)
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let view = Arc::clone(&self.0);
        let dispatcher = scope.action_dispatcher(Action::Destroy);
        let handler: MethodRouter = routing::delete(
            move |mut ctx: ViewContext,
                  id: std::result::Result<Path<V::Id>, PathRejection>,
                  query: std::result::Result<Query<V::Query>, QueryRejection>| {
                let view = Arc::clone(&view);
                let dispatcher = dispatcher.clone();
                async move {
                    let id = decode!(dispatcher, ctx, id, Source::Path);
                    let query = decode!(dispatcher, ctx, query, Source::Query);
                    match view.destroy(&mut ctx, id, query).await {
                        Ok(()) => dispatcher.empty(ctx),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            },
        );
        Ok(vec![scope.describe_action(Action::Destroy, handler)?])
    }
}
