//! Application assembly
//!
//! [`configure_app`] turns a populated [`ViewRouter`] into the served `axum::Router`:
//! problem-details fallbacks, the health probe and the tower middleware stack, each
//! switched by [`Config`].

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::{predicate::SizeAbove, CompressionLayer},
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::health::HealthCheck;
use crate::middleware::{
    metrics_layer, request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
};
use crate::observability::current_trace_id;
use crate::problem::{ApiError, ErrorRegistry, ErrorResponder};
use crate::route::path_shape;
use crate::router::ViewRouter;

/// Responder honouring `api.debug`
#[must_use]
pub fn error_responder(config: &Config, registry: ErrorRegistry) -> ErrorResponder {
    ErrorResponder::new(Arc::new(registry)).with_internal_details(config.api.debug)
}

/// Empty [`ViewRouter`] honouring `features.simplify_operation_ids`
#[must_use]
pub fn view_router(config: &Config, responder: ErrorResponder) -> ViewRouter {
    ViewRouter::new(responder).simplify_operation_ids(config.features.simplify_operation_ids)
}

/// Build the served router
///
/// `health` replaces the default probe (no indicators, configured path and
/// deadline). Layers from innermost to outermost: metrics, CORS, compression,
/// timeout, body limit, tracing, request id handling, panic recovery.
///
/// # Errors
///
/// [`Error::RouteConflict`] when the health path collides with a view route.
pub fn configure_app(
    views: ViewRouter,
    config: &Config,
    health: Option<HealthCheck>,
) -> Result<Router> {
    let responder = views.responder().clone();
    let health = config.healthcheck.enabled.then(|| {
        health
            .unwrap_or_else(|| HealthCheck::from_config(&config.healthcheck))
            .with_responder(responder.clone())
    });
    if let Some(health) = &health {
        check_health_path(&views, health.path())?;
    }

    let mut app = views.into_router();
    if let Some(health) = health {
        tracing::debug!(path = %health.path(), "mounting health probe");
        app = app.merge(health.router());
    }

    if config.features.enable_error_handlers {
        let not_found = responder.clone();
        app = app.fallback(move |uri: Uri, headers: HeaderMap| {
            let responder = not_found.clone();
            async move { route_not_found(&responder, &uri, &headers) }
        });
    }

    if let Some(layer) = metrics_layer(config.features.enable_metrics_middleware) {
        app = app.layer(layer);
    }

    match config.middleware.cors_mode.as_str() {
        "permissive" => app = app.layer(CorsLayer::permissive()),
        "restrictive" => app = app.layer(CorsLayer::new()),
        "disabled" => {}
        other => {
            tracing::warn!(mode = %other, "unknown CORS mode, using permissive");
            app = app.layer(CorsLayer::permissive());
        }
    }

    if config.middleware.compression {
        app = app.layer(
            CompressionLayer::new()
                .compress_when(SizeAbove::new(config.middleware.compression_min_size)),
        );
    }

    app = app
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(RequestBodyLimitLayer::new(config.middleware.body_limit_bytes()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        );

    let tracking = &config.middleware.request_tracking;
    if tracking.mask_sensitive_headers {
        app = app.layer(sensitive_headers_layer());
    }
    if tracking.propagate_headers {
        app = app.layer(request_id_propagation_layer());
    }
    if tracking.request_id_enabled {
        app = app.layer(request_id_layer());
    }

    if config.middleware.catch_panic && config.features.enable_error_handlers {
        app = app.layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| responder.panic_response(panic),
        ));
    }

    Ok(app)
}

/// The probe answers GET; axum cannot mount it on a path that already binds GET or
/// differs from a view path only in parameter names
fn check_health_path(views: &ViewRouter, path: &str) -> Result<()> {
    let shape = path_shape(path);
    let collides = views.routes().iter().any(|route| {
        path_shape(&route.path) == shape
            && (route.path != path || route.methods.contains(&Method::GET))
    });
    if collides {
        return Err(Error::RouteConflict {
            method: Method::GET,
            path: path.to_string(),
        });
    }
    Ok(())
}

fn route_not_found(responder: &ErrorResponder, uri: &Uri, headers: &HeaderMap) -> Response {
    let err = ApiError::not_found(format!("No route matches `{}`", uri.path()));
    responder.respond(&err, Some(uri.path()), current_trace_id(headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::FnIndicator;
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::view::{ListAction, NoParams, ViewConfig, ViewContext, Viewset};
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Numbers;

    impl ListAction for Numbers {
        type Query = NoParams;
        type Output = Vec<u32>;

        async fn list(&self, ctx: &mut ViewContext, _q: NoParams) -> anyhow::Result<Vec<u32>> {
            if ctx.headers().contains_key("x-explode") {
                panic!("boom");
            }
            Ok(vec![1, 2, 3])
        }
    }

    fn app(config: &Config, health: Option<HealthCheck>) -> Router {
        let viewset = Viewset::builder(ViewConfig::new("Number"))
            .list(Arc::new(Numbers))
            .build()
            .unwrap();
        let responder = error_responder(config, ErrorRegistry::builtin());
        let views = view_router(config, responder)
            .with_viewset(&viewset, "/numbers")
            .unwrap();
        configure_app(views, config, health).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_serves_views_with_request_id() {
        let response = app(&Config::default(), None)
            .oneshot(Request::get("/numbers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[&REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .starts_with("req_"));
        assert_eq!(body_json(response).await, serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_unmatched_route_is_problem_404() {
        let response = app(&Config::default(), None)
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()["content-type"],
            "application/problem+json"
        );
        let body = body_json(response).await;
        assert_eq!(body["instance"], "/nowhere");
        assert!(body["trace_id"].as_str().unwrap().starts_with("req_"));
    }

    #[tokio::test]
    async fn test_panic_is_problem_500() {
        let response = app(&Config::default(), None)
            .oneshot(
                Request::get("/numbers")
                    .header("x-explode", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["status"], 500);
    }

    #[tokio::test]
    async fn test_default_health_probe() {
        let response = app(&Config::default(), None)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_custom_health_probe() {
        let health = HealthCheck::new("/live").indicator(FnIndicator::new("db", || async {
            Err(anyhow::anyhow!("connection refused"))
        }));
        let response = app(&Config::default(), Some(health))
            .oneshot(Request::get("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_disabled_healthcheck() {
        let mut config = Config::default();
        config.healthcheck.enabled = false;
        let response = app(&config, None)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_health_path_collision_rejected() {
        let config = Config::default();
        let viewset = Viewset::builder(ViewConfig::new("Number"))
            .list(Arc::new(Numbers))
            .build()
            .unwrap();
        let views = view_router(&config, ErrorResponder::default())
            .with_viewset(&viewset, "/healthz")
            .unwrap();

        let err = configure_app(views, &config, None).unwrap_err();
        assert!(matches!(
            err,
            Error::RouteConflict { method, path } if method == Method::GET && path == "/healthz"
        ));
    }

    #[test]
    fn test_health_path_ignored_when_disabled() {
        let mut config = Config::default();
        config.healthcheck.enabled = false;
        let viewset = Viewset::builder(ViewConfig::new("Number"))
            .list(Arc::new(Numbers))
            .build()
            .unwrap();
        let views = view_router(&config, ErrorResponder::default())
            .with_viewset(&viewset, "/healthz")
            .unwrap();

        assert!(configure_app(views, &config, None).is_ok());
    }

    #[test]
    fn test_unsimplified_ids_from_config() {
        let mut config = Config::default();
        config.features.simplify_operation_ids = false;
        let viewset = Viewset::builder(ViewConfig::new("Number"))
            .list(Arc::new(Numbers))
            .build()
            .unwrap();
        let views = view_router(&config, ErrorResponder::default())
            .with_viewset(&viewset, "/numbers")
            .unwrap();
        assert_eq!(views.routes()[0].operation_id, "numbers_number_list");
    }
}
