//! HTTP server metrics
//!
//! Request counts, durations and sizes are recorded through the global
//! OpenTelemetry meter provider. Without an installed provider the instruments are
//! no-ops, so the layer is safe to attach unconditionally.

#[cfg(feature = "otel-metrics")]
use tower_otel_http_metrics::{HTTPMetricsLayer, HTTPMetricsLayerBuilder, NoOpExtractor};

/// Meter name the instruments are registered under
pub const METER_NAME: &str = "restviews";

/// Build the metrics layer, or `None` when disabled or unavailable
#[cfg(feature = "otel-metrics")]
#[must_use]
pub fn metrics_layer(enabled: bool) -> Option<HTTPMetricsLayer<NoOpExtractor, NoOpExtractor>> {
    if !enabled {
        tracing::debug!("HTTP metrics middleware disabled");
        return None;
    }

    let meter = opentelemetry::global::meter(METER_NAME);
    match HTTPMetricsLayerBuilder::builder().with_meter(meter).build() {
        Ok(layer) => Some(layer),
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP metrics layer");
            None
        }
    }
}

/// Metrics need the `otel-metrics` feature
#[cfg(not(feature = "otel-metrics"))]
#[must_use]
pub fn metrics_layer(enabled: bool) -> Option<tower::layer::util::Identity> {
    if enabled {
        tracing::debug!("HTTP metrics requested but the otel-metrics feature is off");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_layer_is_none() {
        assert!(metrics_layer(false).is_none());
    }

    #[cfg(feature = "otel-metrics")]
    #[test]
    fn test_enabled_layer_builds_on_noop_provider() {
        assert!(metrics_layer(true).is_some());
    }
}
