//! Problem-details wire body

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::kind::ErrorShape;

/// Content type of every error body
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

const EMPTY_DETAIL: &str = "Internal Server Error";

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Location of the offending value, outermost first (e.g. `["body", "price"]`)
    pub loc: Vec<String>,
    /// What is wrong with it
    pub msg: String,
    /// Machine-readable violation type
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldViolation {
    /// Create a violation
    pub fn new<I, S>(loc: I, msg: impl Into<String>, kind: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Same violation nested one level deeper, under `segment`
    #[must_use]
    pub fn prefixed(mut self, segment: impl Into<String>) -> Self {
        self.loc.insert(0, segment.into());
        self
    }
}

/// Structured error body modelled on RFC 9457
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Problem type URI, or `about:blank`
    #[serde(rename = "type")]
    pub type_uri: String,
    /// Short summary fixed by the error kind
    pub title: String,
    /// HTTP status
    pub status: u16,
    /// Occurrence-specific explanation
    pub detail: String,
    /// Request path the problem occurred on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Trace id of the request, when tracing is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Field-level violations (validation failures only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldViolation>>,
}

impl ErrorDetails {
    /// Body for a shape. An empty detail reads "Internal Server Error".
    pub fn new(shape: &ErrorShape, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            type_uri: shape.type_uri.to_string(),
            title: shape.title.to_string(),
            status: shape.status.as_u16(),
            detail: if detail.is_empty() {
                EMPTY_DETAIL.to_string()
            } else {
                detail
            },
            instance: None,
            trace_id: None,
            errors: None,
        }
    }

    /// Override the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the instance path
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the trace id
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Attach field violations
    #[must_use]
    pub fn with_errors(mut self, errors: Option<Vec<FieldViolation>>) -> Self {
        self.errors = errors;
        self
    }

    /// Status as a `StatusCode`
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Render with extra response headers
    #[must_use]
    pub fn into_response_with(self, headers: &HeaderMap) -> Response {
        let status = self.status_code();
        let body = match serde_json::to_vec(&self) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode problem details");
                return status.into_response();
            }
        };

        let mut response = (status, body).into_response();
        let response_headers = response.headers_mut();
        for (name, value) in headers {
            response_headers.insert(name.clone(), value.clone());
        }
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        response
    }
}

impl IntoResponse for ErrorDetails {
    fn into_response(self) -> Response {
        self.into_response_with(&HeaderMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ErrorKind;

    #[test]
    fn test_optional_fields_are_elided() {
        let details = ErrorDetails::new(&ErrorKind::NotFound.shape(), "Item does not exist.");
        let json = serde_json::to_value(&details).unwrap();

        assert_eq!(json["type"], "https://datatracker.ietf.org/doc/html/rfc7231#section-6.5.4");
        assert_eq!(json["title"], "Not Found");
        assert_eq!(json["status"], 404);
        assert_eq!(json["detail"], "Item does not exist.");
        assert!(json.get("instance").is_none());
        assert!(json.get("trace_id").is_none());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_empty_detail_defaults() {
        let details = ErrorDetails::new(&ErrorKind::BadRequest.shape(), "");
        assert_eq!(details.detail, "Internal Server Error");
    }

    #[test]
    fn test_violation_serializes_type_key() {
        let violation = FieldViolation::new(["price"], "expected an integer", "int_type")
            .prefixed("body");
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["loc"], serde_json::json!(["body", "price"]));
        assert_eq!(json["type"], "int_type");
    }

    #[test]
    fn test_response_carries_problem_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static("30"));

        let response = ErrorDetails::new(&ErrorKind::TooManyRequests.shape(), "slow down")
            .into_response_with(&headers);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            APPLICATION_PROBLEM_JSON
        );
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }
}
