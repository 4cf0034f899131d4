//! Turning action outcomes into responses

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use serde::Serialize;

use crate::error::Result;
use crate::problem::{ApiError, ErrorKind, ErrorResponder, ErrorShape, FieldViolation};
use crate::route::{join_path, slugify, validate_path, Action, ResponseModel, RouteDescriptor, RouteKind};
use crate::serializer::Serializer;

use super::config::ViewConfig;
use super::context::ViewContext;

/// Source of a rejected request part; becomes the first segment of the violation `loc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Path,
    Query,
    Body,
}

impl Source {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

/// Everything a provider needs to describe its routes
pub struct RouteScope<'a> {
    config: &'a Arc<ViewConfig>,
    responder: &'a ErrorResponder,
    prefix: &'a str,
}

impl<'a> RouteScope<'a> {
    pub(crate) fn new(
        config: &'a Arc<ViewConfig>,
        responder: &'a ErrorResponder,
        prefix: &'a str,
    ) -> Self {
        Self {
            config,
            responder,
            prefix,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        self.config
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix
    }

    /// Dispatcher bound to one route
    #[must_use]
    pub fn dispatcher(&self, status: StatusCode, many: bool) -> Dispatcher {
        let serializer = self.config.response_schema.clone().map(|schema| {
            Arc::new(if many {
                Serializer::many(schema)
            } else {
                Serializer::new(schema)
            })
        });
        Dispatcher {
            config: Arc::clone(self.config),
            responder: self.responder.clone(),
            serializer,
            status,
        }
    }

    /// Dispatcher that emits values as they are, without the response schema
    #[must_use]
    pub fn plain_dispatcher(&self, status: StatusCode) -> Dispatcher {
        Dispatcher {
            serializer: None,
            ..self.dispatcher(status, false)
        }
    }

    /// Dispatcher for a CRUD action
    #[must_use]
    pub fn action_dispatcher(&self, action: Action) -> Dispatcher {
        self.dispatcher(action.status(), self.lists_many(action))
    }

    fn lists_many(&self, action: Action) -> bool {
        action == Action::List && self.config.response_schema_as_list
    }

    /// Shapes for a set of error kinds, plus the view-wide ones
    #[must_use]
    pub fn declared_errors(&self, kinds: &[ErrorKind]) -> BTreeMap<u16, ErrorShape> {
        let registry = self.responder.registry();
        kinds
            .iter()
            .chain(&self.config.errors)
            .map(|kind| {
                let status = kind.status();
                let shape = registry.get(status).cloned().unwrap_or_else(|| kind.shape());
                (status.as_u16(), shape)
            })
            .collect()
    }

    /// `"{component}_{suffix}"`
    #[must_use]
    pub fn operation_id(&self, suffix: &str) -> String {
        format!("{}_{suffix}", slugify(&self.config.component_name))
    }

    /// Descriptor of a CRUD action route
    ///
    /// # Errors
    ///
    /// The path template is invalid.
    pub fn describe_action(&self, action: Action, handler: MethodRouter) -> Result<RouteDescriptor> {
        let suffix = if action.is_detail() {
            self.config.detail_route.as_str()
        } else {
            ""
        };
        let path = join_path(self.prefix, suffix);
        validate_path(&path)?;

        let response_model = match action {
            Action::Destroy => None,
            _ => self.config.response_schema.clone().map(|schema| ResponseModel {
                schema,
                many: self.lists_many(action),
            }),
        };

        Ok(RouteDescriptor {
            path,
            methods: vec![action.method()],
            operation_id: self.operation_id(action.verb()),
            name: format!("{} {}", action.label(), self.config.component_name),
            status_code: action.status(),
            response_model,
            declared_errors: self.declared_errors(action.default_errors()),
            kind: RouteKind::Action(action),
            handler,
        })
    }
}

/// Builds the response of one route
///
/// Cloned into every generated handler.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Arc<ViewConfig>,
    responder: ErrorResponder,
    serializer: Option<Arc<Serializer>>,
    status: StatusCode,
}

impl Dispatcher {
    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// 422 for a request part that failed to decode
    #[must_use]
    pub fn reject(&self, ctx: &ViewContext, source: Source, rejection: impl Display) -> Response {
        tracing::debug!(source = source.as_str(), error = %rejection, "request rejected");
        let violation = FieldViolation::new([source.as_str()], rejection.to_string(), "value_error");
        self.error(ctx, &ApiError::validation(vec![violation]))
    }

    /// Render an [`ApiError`] for this request
    #[must_use]
    pub fn error(&self, ctx: &ViewContext, err: &ApiError) -> Response {
        self.responder
            .respond(err, Some(ctx.path()), ctx.trace_id().map(str::to_string))
    }

    /// Classify and render an action failure
    #[must_use]
    pub fn fail(&self, ctx: &ViewContext, err: anyhow::Error) -> Response {
        let err = self.responder.classify(err);
        self.error(ctx, &err)
    }

    /// 404 `"{component_name} does not exist."`
    #[must_use]
    pub fn not_found(&self, ctx: &ViewContext) -> Response {
        self.error(ctx, &ApiError::not_found(self.config.not_found_detail()))
    }

    /// Serialize `value` through the response schema
    #[must_use]
    pub fn ok<T>(&self, mut ctx: ViewContext, value: &T) -> Response
    where
        T: Serialize + Any,
    {
        let encoded = match &self.serializer {
            Some(serializer) => serializer
                .serialize(value, &self.config.serializer)
                .map_err(|err| self.error(&ctx, &err)),
            None => serde_json::to_vec(value).map(Into::into).map_err(|e| {
                tracing::error!(error = %e, "response is not serializable");
                self.error(&ctx, &ApiError::internal("Response could not be serialized"))
            }),
        };
        let bytes: axum::body::Bytes = match encoded {
            Ok(bytes) => bytes,
            Err(response) => return response,
        };

        let status = ctx.status().unwrap_or(self.status);
        let mut response = (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response();
        response.headers_mut().extend(ctx.take_response_headers());
        response
    }

    /// Option result of a retrieve/update: 404 (or `null`) on `None`
    #[must_use]
    pub fn ok_or_not_found<T>(&self, ctx: ViewContext, value: Option<T>) -> Response
    where
        T: Serialize + Any,
    {
        match value {
            Some(value) => self.ok(ctx, &value),
            None if self.config.raise_on_none => self.not_found(&ctx),
            None => self.ok(ctx, &Option::<T>::None),
        }
    }

    /// Body-less response
    #[must_use]
    pub fn empty(&self, mut ctx: ViewContext) -> Response {
        let status = ctx.status().unwrap_or(self.status);
        let mut response = status.into_response();
        response.headers_mut().extend(ctx.take_response_headers());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType, Schema};
    use axum::http::{HeaderMap, Method};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    fn config() -> Arc<ViewConfig> {
        Arc::new(
            ViewConfig::new("Shopping Item")
                .with_response_schema(
                    Schema::new("Item")
                        .field(Field::new("id", FieldType::Integer))
                        .field(Field::new("name", FieldType::String)),
                )
                .throws(ErrorKind::Forbidden),
        )
    }

    fn ctx() -> ViewContext {
        ViewContext::new(Method::GET, "/items/1", HeaderMap::new())
    }

    async fn body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_describe_action() {
        let config = config();
        let responder = ErrorResponder::default();
        let scope = RouteScope::new(&config, &responder, "/items");

        let route = scope
            .describe_action(Action::Retrieve, MethodRouter::new())
            .unwrap();
        assert_eq!(route.path, "/items/{id}");
        assert_eq!(route.operation_id, "shopping_item_get");
        assert_eq!(route.name, "Get Shopping Item");
        assert_eq!(route.declared_errors.keys().copied().collect::<Vec<_>>(), [403, 404]);

        let list = scope.describe_action(Action::List, MethodRouter::new()).unwrap();
        assert_eq!(list.path, "/items");
        assert!(list.response_model.is_some_and(|m| m.many));

        let destroy = scope.describe_action(Action::Destroy, MethodRouter::new()).unwrap();
        assert!(destroy.response_model.is_none());
        assert_eq!(destroy.status_code, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_not_found_detail() {
        let config = config();
        let responder = ErrorResponder::default();
        let dispatcher =
            RouteScope::new(&config, &responder, "/items").action_dispatcher(Action::Retrieve);

        let response = dispatcher.ok_or_not_found(ctx(), Option::<Value>::None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body(response).await;
        assert_eq!(body["detail"], "Shopping Item does not exist.");
        assert_eq!(body["instance"], "/items/1");
    }

    #[tokio::test]
    async fn test_ok_validates_output() {
        let config = config();
        let responder = ErrorResponder::default();
        let dispatcher =
            RouteScope::new(&config, &responder, "/items").action_dispatcher(Action::Retrieve);

        let response = dispatcher.ok(ctx(), &json!({"id": 1, "name": "pen", "secret": 1}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, json!({"id": 1, "name": "pen"}));

        let response = dispatcher.ok(ctx(), &json!({"id": "one"}));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_reject_reports_source() {
        let config = config();
        let responder = ErrorResponder::default();
        let dispatcher =
            RouteScope::new(&config, &responder, "/items").action_dispatcher(Action::Create);

        let response = dispatcher.reject(&ctx(), Source::Body, "expected value at line 1");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body(response).await["errors"][0]["loc"], json!(["body"]));
    }

    #[test]
    fn test_declared_errors_merge_view_kinds() {
        let config = config();
        let responder = ErrorResponder::default();
        let scope = RouteScope::new(&config, &responder, "/items");

        let errors = scope.declared_errors(&[ErrorKind::Conflict, ErrorKind::Forbidden]);
        assert_eq!(errors.keys().copied().collect::<Vec<_>>(), [403, 409]);
        assert_eq!(scope.declared_errors(&[]).keys().copied().collect::<Vec<_>>(), [403]);
    }

    #[test]
    fn test_empty_uses_status_override() {
        let config = config();
        let responder = ErrorResponder::default();
        let dispatcher =
            RouteScope::new(&config, &responder, "/items").action_dispatcher(Action::Destroy);

        let mut ctx = ctx();
        assert_eq!(dispatcher.empty(ctx.clone()).status(), StatusCode::NO_CONTENT);
        ctx.set_status(StatusCode::ACCEPTED);
        assert_eq!(dispatcher.empty(ctx).status(), StatusCode::ACCEPTED);
    }
}
