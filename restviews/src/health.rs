//! Health check endpoint
//!
//! A [`HealthCheck`] runs every registered [`HealthIndicator`] concurrently under one
//! deadline. The probe succeeds with `{"status": "ok"}` only when every indicator
//! succeeds in time; a failing indicator or an expired deadline yields a 503 problem
//! body. Indicators still running at the deadline are dropped, not awaited.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::HealthcheckConfig;
use crate::problem::{ApiError, ErrorResponder};

/// Body of a passing probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// One dependency check
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// `Ok(())` when healthy
    async fn check(&self) -> anyhow::Result<()>;
}

/// Indicator from an async closure
pub struct FnIndicator<F> {
    name: String,
    check: F,
}

impl<F, Fut> FnIndicator<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl<F, Fut> HealthIndicator for FnIndicator<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> anyhow::Result<()> {
        (self.check)().await
    }
}

/// Aggregated health probe
#[derive(Clone)]
pub struct HealthCheck {
    path: String,
    timeout: Duration,
    indicators: Vec<Arc<dyn HealthIndicator>>,
    responder: ErrorResponder,
}

impl HealthCheck {
    /// Probe at `path` with a 10 second deadline
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timeout: Duration::from_secs(10),
            indicators: Vec::new(),
            responder: ErrorResponder::default(),
        }
    }

    /// Probe at the configured path with the configured deadline
    #[must_use]
    pub fn from_config(config: &HealthcheckConfig) -> Self {
        Self::new(config.path.clone()).with_timeout(config.timeout())
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_responder(mut self, responder: ErrorResponder) -> Self {
        self.responder = responder;
        self
    }

    #[must_use]
    pub fn indicator(mut self, indicator: impl HealthIndicator + 'static) -> Self {
        self.indicators.push(Arc::new(indicator));
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run every indicator; the first failure (or the deadline) fails the probe
    ///
    /// # Errors
    ///
    /// 503 describing the failure.
    pub async fn probe(&self) -> Result<HealthResponse, ApiError> {
        let checks = self.indicators.iter().map(|indicator| async move {
            indicator
                .check()
                .await
                .map_err(|e| (indicator.name().to_string(), e))
        });

        match tokio::time::timeout(self.timeout, join_all(checks)).await {
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "health check timed out");
                Err(unhealthy())
            }
            Ok(results) => {
                let failures: Vec<_> = results.into_iter().filter_map(Result::err).collect();
                if failures.is_empty() {
                    return Ok(HealthResponse::ok());
                }
                for (name, err) in &failures {
                    tracing::warn!(indicator = %name, error = %err, "health check failed");
                }
                Err(unhealthy())
            }
        }
    }

    /// Router serving the probe with `GET`
    #[must_use]
    pub fn router(self) -> Router {
        let path = self.path.clone();
        Router::new()
            .route(&path, get(probe_handler))
            .with_state(Arc::new(self))
    }
}

fn unhealthy() -> ApiError {
    ApiError::unavailable("Service health check failed")
}

async fn probe_handler(State(health): State<Arc<HealthCheck>>) -> Response {
    match health.probe().await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => health.responder.respond(&err, Some(&health.path), None),
    }
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheck")
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .field(
                "indicators",
                &self.indicators.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn passing(name: &str) -> FnIndicator<impl Fn() -> futures::future::Ready<anyhow::Result<()>> + Send + Sync> {
        FnIndicator::new(name, || futures::future::ready(Ok(())))
    }

    fn failing(name: &str) -> FnIndicator<impl Fn() -> futures::future::Ready<anyhow::Result<()>> + Send + Sync> {
        FnIndicator::new(name, || futures::future::ready(Err(anyhow::anyhow!("down"))))
    }

    #[tokio::test]
    async fn test_all_passing() {
        let health = HealthCheck::new("/healthz")
            .indicator(passing("db"))
            .indicator(passing("cache"));
        assert_eq!(health.probe().await.unwrap(), HealthResponse::ok());
    }

    #[tokio::test]
    async fn test_one_failure_fails_probe() {
        for failing_index in 0..3 {
            let mut health = HealthCheck::new("/healthz");
            for index in 0..3 {
                health = if index == failing_index {
                    health.indicator(failing("flaky"))
                } else {
                    health.indicator(passing("ok"))
                };
            }
            let err = health.probe().await.unwrap_err();
            assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[tokio::test]
    async fn test_deadline_fails_probe() {
        let health = HealthCheck::new("/healthz")
            .with_timeout(Duration::from_millis(20))
            .indicator(FnIndicator::new("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }));
        assert!(health.probe().await.is_err());
    }

    #[tokio::test]
    async fn test_router_serves_probe() {
        let app = HealthCheck::new("/healthz")
            .indicator(passing("a"))
            .indicator(failing("b"))
            .indicator(passing("c"))
            .router();

        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], 503);
        assert_eq!(body["instance"], "/healthz");
    }
}
