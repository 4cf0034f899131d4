//! Per-request context handed to view actions

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
};

use crate::observability::current_trace_id;

/// Request facts an action may read, plus response adjustments it may make
///
/// Built for every request by the generated handlers. An action can override the success
/// status or add response headers; the dispatcher applies both when it writes the
/// response.
#[derive(Debug, Clone)]
pub struct ViewContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    trace_id: Option<String>,
    status: Option<StatusCode>,
    response_headers: HeaderMap,
}

impl ViewContext {
    /// Context for a request line and headers
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap) -> Self {
        let trace_id = current_trace_id(&headers);
        Self {
            method,
            path: path.into(),
            headers,
            trace_id,
            status: None,
            response_headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, used as the `instance` of error bodies
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Override the success status of this response
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Add a header to the success response
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub(crate) fn take_response_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.response_headers)
    }
}

impl<S> FromRequestParts<S> for ViewContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(
            parts.method.clone(),
            parts.uri.path(),
            parts.headers.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Request};

    #[tokio::test]
    async fn test_extracts_request_facts() {
        let request = Request::builder()
            .method(Method::PATCH)
            .uri("/items/42?fields=name")
            .header("x-request-id", "req_abc")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = ViewContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.method(), Method::PATCH);
        assert_eq!(ctx.path(), "/items/42");
        assert_eq!(ctx.trace_id(), Some("req_abc"));
    }

    #[test]
    fn test_response_adjustments() {
        let mut ctx = ViewContext::new(Method::GET, "/items", HeaderMap::new());
        ctx.set_status(StatusCode::ACCEPTED);
        ctx.insert_header(header::LOCATION, HeaderValue::from_static("/items/1"));

        assert_eq!(ctx.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(ctx.take_response_headers().len(), 1);
        assert!(ctx.response_headers().is_empty());
    }
}
