//! Structured errors raised by action code
//!
//! Returning an [`ApiError`] (directly, or through `?` into `anyhow::Error`) is the one
//! sanctioned way for an action to stop with a structured response. The dispatch layer
//! renders it through the [`ErrorRegistry`].
//!
//! ```rust
//! use restviews::problem::{ApiError, ErrorKind};
//!
//! let err = ApiError::not_found("Item does not exist.");
//! assert_eq!(err.kind, Some(ErrorKind::NotFound));
//! assert_eq!(err.title(), "Not Found");
//! ```

use axum::http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode};
use thiserror::Error;

use super::details::{ErrorDetails, FieldViolation};
use super::kind::{default_title, ErrorKind, ErrorShape};
use super::registry::ErrorRegistry;

/// Request-time error carrying a status, title and detail
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Explicit title; resolved from the kind or status when absent
    pub title: Option<String>,
    /// Occurrence-specific explanation
    pub detail: String,
    /// Request path; filled from the current request when absent
    pub instance: Option<String>,
    /// Extra response headers
    pub headers: HeaderMap,
    /// Field-level violations
    pub errors: Option<Vec<FieldViolation>>,
    /// Built-in kind, when constructed through one
    pub kind: Option<ErrorKind>,
}

impl ApiError {
    /// Error with an arbitrary status
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: None,
            detail: detail.into(),
            instance: None,
            headers: HeaderMap::new(),
            errors: None,
            kind: None,
        }
    }

    /// Error of a built-in kind
    pub fn of_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(kind.status(), detail)
        }
    }

    /// 400 Bad Request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::BadRequest, detail)
    }

    /// 401 Unauthorized
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Unauthorized, detail)
    }

    /// 403 Forbidden
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Forbidden, detail)
    }

    /// 404 Not Found
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::NotFound, detail)
    }

    /// 409 Conflict
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Conflict, detail)
    }

    /// 422 Unprocessable Entity
    pub fn unprocessable_entity(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::UnprocessableEntity, detail)
    }

    /// 422 carrying field violations
    pub fn validation(errors: Vec<FieldViolation>) -> Self {
        Self::unprocessable_entity("Request validation failed").with_errors(errors)
    }

    /// 429 Too Many Requests
    pub fn throttled(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::TooManyRequests, detail)
    }

    /// 500 Internal Server Error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::InternalServerError, detail)
    }

    /// 503 Service Unavailable
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::ServiceUnavailable, detail)
    }

    /// Override the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the instance path
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Attach field violations
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<FieldViolation>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Attach a response header. Invalid header values are dropped with a warning.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: impl AsRef<str>) -> Self {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "dropping invalid header value"),
        }
        self
    }

    /// Attach `Retry-After` in seconds
    #[must_use]
    pub fn with_retry_after(self, seconds: u64) -> Self {
        self.with_header(axum::http::header::RETRY_AFTER, seconds.to_string())
    }

    /// Title without consulting a registry
    #[must_use]
    pub fn title(&self) -> String {
        match (&self.title, self.kind) {
            (Some(title), _) => title.clone(),
            (None, Some(kind)) => kind.title().to_string(),
            (None, None) => default_title(self.status).to_string(),
        }
    }

    fn shape(&self, registry: &ErrorRegistry) -> ErrorShape {
        registry
            .get(self.status)
            .cloned()
            .or_else(|| self.kind.map(|kind| kind.shape()))
            .unwrap_or_else(|| ErrorShape::generic(self.status))
    }

    /// Build the wire body
    ///
    /// `type` comes from the registry; `title` is the explicit title, else the registered
    /// one, else the status table. `instance` falls back to `request_path`.
    #[must_use]
    pub fn as_model(
        &self,
        registry: &ErrorRegistry,
        request_path: Option<&str>,
        trace_id: Option<String>,
    ) -> ErrorDetails {
        let shape = self.shape(registry);
        let mut details = ErrorDetails::new(&shape, self.detail.clone())
            .with_trace_id(trace_id)
            .with_errors(self.errors.clone());
        if let Some(title) = &self.title {
            details = details.with_title(title.clone());
        }
        if let Some(instance) = self.instance.as_deref().or(request_path) {
            details = details.with_instance(instance);
        }
        details
    }
}
