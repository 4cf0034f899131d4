//! Turning failures into problem-details responses

use std::any::Any;
use std::sync::Arc;

use axum::{http::HeaderMap, response::Response};

use super::api_error::ApiError;
use super::kind::ErrorKind;
use super::registry::ErrorRegistry;

const INTERNAL_DETAIL: &str = "An unexpected error occurred.";

/// Renders every error class with the same body shape
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct ErrorResponder {
    registry: Arc<ErrorRegistry>,
    expose_internal: bool,
}

impl Default for ErrorResponder {
    fn default() -> Self {
        Self::new(Arc::new(ErrorRegistry::builtin()))
    }
}

impl ErrorResponder {
    /// Responder over a registry
    pub fn new(registry: Arc<ErrorRegistry>) -> Self {
        Self {
            registry,
            expose_internal: false,
        }
    }

    /// Put the message of unhandled errors and panics into `detail`
    #[must_use]
    pub fn with_internal_details(mut self, expose: bool) -> Self {
        self.expose_internal = expose;
        self
    }

    /// The registry this responder renders through
    #[must_use]
    pub fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    /// Classify an action failure
    ///
    /// An [`ApiError`] anywhere in the chain is returned as is. Error types registered
    /// with [`ErrorRegistry::register_error`] get their status and the error's message.
    /// Anything else is logged and collapsed into a 500.
    #[must_use]
    pub fn classify(&self, err: anyhow::Error) -> ApiError {
        let err = match err.downcast::<ApiError>() {
            Ok(api) => return api,
            Err(err) => err,
        };

        if let Some(status) = self.registry.status_for(&err) {
            tracing::warn!(status = status.as_u16(), error = %err, "mapped error");
            return ApiError {
                kind: ErrorKind::from_status(status),
                ..ApiError::new(status, err.to_string())
            };
        }

        tracing::error!(error = ?err, "unhandled error");
        let detail = if self.expose_internal {
            format!("{err:#}")
        } else {
            INTERNAL_DETAIL.to_string()
        };
        ApiError::internal(detail)
    }

    /// Render an [`ApiError`]
    #[must_use]
    pub fn respond(
        &self,
        err: &ApiError,
        request_path: Option<&str>,
        trace_id: Option<String>,
    ) -> Response {
        tracing::debug!(
            status = err.status.as_u16(),
            detail = %err.detail,
            "responding with api error"
        );
        err.as_model(&self.registry, request_path, trace_id)
            .into_response_with(&err.headers)
    }

    /// Classify and render an action failure
    #[must_use]
    pub fn respond_to(
        &self,
        err: anyhow::Error,
        request_path: Option<&str>,
        trace_id: Option<String>,
    ) -> Response {
        let err = self.classify(err);
        self.respond(&err, request_path, trace_id)
    }

    /// Render a caught panic as a 500
    #[must_use]
    pub fn panic_response(&self, panic: Box<dyn Any + Send + 'static>) -> Response {
        let message = if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else {
            "unknown panic payload".to_string()
        };
        tracing::error!(panic = %message, "handler panicked");

        let detail = if self.expose_internal {
            message
        } else {
            INTERNAL_DETAIL.to_string()
        };
        ApiError::internal(detail)
            .as_model(&self.registry, None, None)
            .into_response_with(&HeaderMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[derive(Debug, thiserror::Error)]
    #[error("stock exhausted")]
    struct StockExhausted;

    #[test]
    fn test_classify_passes_api_errors_through() {
        let responder = ErrorResponder::default();
        let err = responder.classify(ApiError::forbidden("not yours").into());
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.detail, "not yours");
    }

    #[test]
    fn test_classify_finds_api_error_under_context() {
        let responder = ErrorResponder::default();
        let err = anyhow::Error::new(ApiError::conflict("taken")).context("creating item");
        assert_eq!(responder.classify(err).status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_classify_uses_error_mapping() {
        let registry = ErrorRegistry::builtin().map_error::<StockExhausted>(StatusCode::CONFLICT);
        let responder = ErrorResponder::new(Arc::new(registry));

        let err = responder.classify(StockExhausted.into());
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.title(), "Conflict");
        assert_eq!(err.detail, "stock exhausted");
    }

    #[test]
    fn test_unhandled_errors_hide_internals() {
        let responder = ErrorResponder::default();
        let err = responder.classify(anyhow::anyhow!("password=hunter2"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.title(), "Internal Server Error");
        assert!(!err.detail.contains("hunter2"));

        let debug = ErrorResponder::default().with_internal_details(true);
        assert!(debug.classify(anyhow::anyhow!("boom")).detail.contains("boom"));
    }

    #[test]
    fn test_panic_response_is_500() {
        let responder = ErrorResponder::default();
        let response = responder.panic_response(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
