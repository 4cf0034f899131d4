//! Tower layers attached by [`configure_app`](crate::app::configure_app)

pub mod metrics;
pub mod request_tracking;

pub use metrics::metrics_layer;
pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
    RequestTrackingConfig, REQUEST_ID_HEADER, SENSITIVE_HEADERS,
};
