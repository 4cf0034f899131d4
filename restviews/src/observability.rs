//! Structured logging and trace correlation

use axum::http::HeaderMap;
use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};
use crate::middleware::REQUEST_ID_HEADER;

/// Install the JSON log subscriber
///
/// The filter comes from `service.log_level`; an unparsable level falls back to
/// `info`. Calling this twice is harmless.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = %config.service.name, "tracing initialized");
    }
    Ok(())
}

/// Flush pending telemetry before exit
pub fn shutdown_tracing() {
    tracing::info!("tracing shutdown complete");
}

/// Correlation id for the request being served
///
/// The active OpenTelemetry trace id when the current span carries a valid one,
/// otherwise the request id assigned by the request tracking middleware.
#[must_use]
pub fn current_trace_id(headers: &HeaderMap) -> Option<String> {
    otel_trace_id().or_else(|| {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    })
}

#[cfg(feature = "observability")]
fn otel_trace_id() -> Option<String> {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let context = tracing::Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

#[cfg(not(feature = "observability"))]
fn otel_trace_id() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_init_tracing_twice() {
        let config = Config::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }

    #[test]
    fn test_trace_id_falls_back_to_request_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(current_trace_id(&headers), None);

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req_01h455vb4pex5vsknk084sn02q"));
        assert_eq!(
            current_trace_id(&headers).as_deref(),
            Some("req_01h455vb4pex5vsknk084sn02q")
        );
    }
}
