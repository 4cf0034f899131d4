//! Extra named routes on a viewset

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query,
    },
    http::{Method, StatusCode},
    routing::{on, MethodRouter},
};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::problem::{ApiError, ErrorKind, FieldViolation};
use crate::route::{join_path, method_filter, validate_path, RouteDescriptor, RouteKind};

use super::context::ViewContext;
use super::dispatch::{Dispatcher, RouteScope, Source};
use super::mixins::RouteProvider;

/// Decoded request parts of a custom route
#[derive(Debug, Clone, Default)]
pub struct RouteInput {
    /// Path parameters
    pub path: HashMap<String, String>,
    /// Query string
    pub query: HashMap<String, String>,
    /// JSON body, when one was sent
    pub body: Option<Value>,
}

impl RouteInput {
    /// Parse one path parameter
    ///
    /// # Errors
    ///
    /// 422 when the parameter is missing or does not parse.
    pub fn path_param<T: FromStr>(&self, name: &str) -> std::result::Result<T, ApiError> {
        let raw = self.path.get(name).ok_or_else(|| {
            ApiError::validation(vec![FieldViolation::new(["path", name], "Field required", "missing")])
        })?;
        raw.parse().map_err(|_| {
            ApiError::validation(vec![FieldViolation::new(
                ["path", name],
                format!("Invalid value `{raw}`"),
                "value_error",
            )])
        })
    }

    /// Decode the body
    ///
    /// # Errors
    ///
    /// 422 when no body was sent or it does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, ApiError> {
        let body = self.body.clone().ok_or_else(|| {
            ApiError::validation(vec![FieldViolation::new(["body"], "Field required", "missing")])
        })?;
        serde_json::from_value(body).map_err(|e| {
            ApiError::validation(vec![FieldViolation::new(["body"], e.to_string(), "value_error")])
        })
    }
}

type BindFn = dyn Fn(Dispatcher) -> MethodRouter + Send + Sync;
type PathParams = std::result::Result<Path<HashMap<String, String>>, PathRejection>;
type QueryParams = std::result::Result<Query<HashMap<String, String>>, QueryRejection>;

/// A named route added next to the CRUD actions
///
/// Its operation id is `"{component}_{name}"`. The handler borrows the request context
/// and receives the decoded input. It returns a boxed future of any serializable value,
/// emitted as JSON with the route's status unless the handler set another one on the
/// context. Headers inserted on the context are sent too. Failures go through the same
/// classification as CRUD actions.
///
/// ```rust,ignore
/// let items = Arc::new(ItemsView::default());
/// let publish = CustomRoute::new("publish", "/{id}/publish", [Method::POST], {
///     let items = Arc::clone(&items);
///     move |ctx: &mut ViewContext, input: RouteInput| {
///         let items = Arc::clone(&items);
///         Box::pin(async move { items.publish(ctx, input.path_param("id")?).await })
///     }
/// })
/// .throws(ErrorKind::Conflict);
/// ```
pub struct CustomRoute {
    name: String,
    path: String,
    methods: Vec<Method>,
    status: StatusCode,
    errors: Vec<ErrorKind>,
    bind: Arc<BindFn>,
}

impl CustomRoute {
    /// Route at `path` (appended to the viewset prefix)
    pub fn new<F, T>(
        name: impl Into<String>,
        path: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
        handler: F,
    ) -> Self
    where
        F: for<'c> Fn(&'c mut ViewContext, RouteInput) -> BoxFuture<'c, anyhow::Result<T>>
            + Clone
            + Send
            + Sync
            + 'static,
        T: Serialize + Send + 'static,
    {
        let methods: Vec<Method> = methods.into_iter().collect();
        let filters = methods.clone();
        let bind = move |dispatcher: Dispatcher| {
            let handler = handler.clone();
            let route_handler = move |mut ctx: ViewContext, path: PathParams, query: QueryParams, body: Bytes| {
                let handler = handler.clone();
                let dispatcher = dispatcher.clone();
                async move {
                    let path = match path {
                        Ok(Path(params)) => params,
                        Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
                        Err(rejection) => return dispatcher.reject(&ctx, Source::Path, rejection),
                    };
                    let query = match query {
                        Ok(Query(params)) => params,
                        Err(rejection) => return dispatcher.reject(&ctx, Source::Query, rejection),
                    };
                    let body = if body.is_empty() {
                        None
                    } else {
                        match serde_json::from_slice::<Value>(&body) {
                            Ok(value) => Some(value),
                            Err(e) => return dispatcher.reject(&ctx, Source::Body, e),
                        }
                    };
                    let input = RouteInput { path, query, body };
                    match handler(&mut ctx, input).await {
                        Ok(value) => dispatcher.ok(ctx, &value),
                        Err(err) => dispatcher.fail(&ctx, err),
                    }
                }
            };
            filters
                .iter()
                .filter_map(method_filter)
                .fold(MethodRouter::new(), |router, filter| {
                    router.merge(on(filter, route_handler.clone()))
                })
        };

        Self {
            name: name.into(),
            path: path.into(),
            methods,
            status: StatusCode::OK,
            errors: Vec::new(),
            bind: Arc::new(bind),
        }
    }

    /// Status of a successful response unless the handler sets one
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Declare an error kind the handler may produce
    #[must_use]
    pub fn throws(mut self, kind: ErrorKind) -> Self {
        if !self.errors.contains(&kind) {
            self.errors.push(kind);
        }
        self
    }

    /// Suffix of the operation id
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRoute")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl RouteProvider for CustomRoute {
    fn action(&self) -> Option<crate::route::Action> {
        None
    }

    fn describe(&self, scope: &RouteScope<'_>) -> Result<Vec<RouteDescriptor>> {
        let path = join_path(scope.prefix(), &self.path);
        validate_path(&path)?;
        if let Some(method) = self.methods.iter().find(|m| method_filter(m).is_none()) {
            return Err(Error::InvalidRoute {
                path,
                reason: format!("unsupported method {method}"),
            });
        }
        if self.methods.is_empty() {
            return Err(Error::InvalidRoute {
                path,
                reason: "no methods".to_string(),
            });
        }

        let dispatcher = scope.plain_dispatcher(self.status);
        Ok(vec![RouteDescriptor {
            path,
            methods: self.methods.clone(),
            operation_id: scope.operation_id(&self.name),
            name: self.name.clone(),
            status_code: self.status,
            response_model: None,
            declared_errors: scope.declared_errors(&self.errors),
            kind: RouteKind::Custom(self.name.clone()),
            handler: (self.bind)(dispatcher),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ErrorResponder;
    use crate::router::ViewRouter;
    use crate::view::{ViewConfig, Viewset};
    use axum::{
        body::Body,
        http::{header, HeaderValue, Request},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn archive_route() -> CustomRoute {
        CustomRoute::new(
            "archive",
            "/{id}/archive",
            [Method::POST],
            |ctx: &mut ViewContext, input: RouteInput| {
                Box::pin(async move {
                    let id: u32 = input.path_param("id")?;
                    let location = HeaderValue::try_from(format!("/jobs/{id}"))?;
                    ctx.set_status(StatusCode::ACCEPTED);
                    ctx.insert_header(header::LOCATION, location);
                    Ok(serde_json::json!({ "queued": id }))
                })
            },
        )
    }

    #[tokio::test]
    async fn test_handler_sets_status_and_headers() {
        let viewset = Viewset::builder(ViewConfig::new("Report"))
            .route(archive_route())
            .build()
            .unwrap();
        let app = ViewRouter::new(ErrorResponder::default())
            .with_viewset(&viewset, "/reports")
            .unwrap()
            .into_router();

        let response = app
            .oneshot(
                Request::post("/reports/7/archive")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::LOCATION], "/jobs/7");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"queued":7}"#);
    }

    #[test]
    fn test_path_param_parses() {
        let input = RouteInput {
            path: HashMap::from([("id".to_string(), "42".to_string())]),
            ..RouteInput::default()
        };
        assert_eq!(input.path_param::<u32>("id").unwrap(), 42);

        let err = input.path_param::<u32>("missing").unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.errors.unwrap()[0].loc, ["path", "missing"]);
    }

    #[test]
    fn test_json_requires_body() {
        let input = RouteInput::default();
        assert!(input.json::<Value>().is_err());

        let input = RouteInput {
            body: Some(serde_json::json!({"reason": "sold out"})),
            ..RouteInput::default()
        };
        let body: HashMap<String, String> = input.json().unwrap();
        assert_eq!(body["reason"], "sold out");
    }
}
