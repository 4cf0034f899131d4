//! Request identifiers
//!
//! Every request served through [`configure_app`](crate::app::configure_app) gets a
//! TypeID with the `req` prefix and a UUIDv7 suffix, e.g.
//! `req_01h455vb4pex5vsknk084sn02q`. The id is echoed on the response and ends up
//! as `trace_id` in error bodies when no OpenTelemetry span is active.

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderValue, Request};
use mti::prelude::*;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Time-sortable request id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    pub const PREFIX: &'static str = "req";

    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected request id text
#[derive(Debug, thiserror::Error)]
pub enum RequestIdError {
    #[error("malformed request id: {0}")]
    Malformed(#[from] MagicTypeIdError),

    #[error("request id has prefix `{0}`, expected `req`")]
    WrongPrefix(String),
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = MagicTypeId::from_str(s)?;
        let prefix = id.prefix().as_str();
        if prefix != Self::PREFIX {
            return Err(RequestIdError::WrongPrefix(prefix.to_string()));
        }
        Ok(Self(id))
    }
}

/// Generator plugged into `SetRequestIdLayer`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let value = HeaderValue::from_str(RequestId::new().as_str()).ok()?;
        Some(TowerRequestId::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_prefixed_and_sortable() {
        let first = RequestId::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = RequestId::new();

        assert!(first.as_str().starts_with("req_"));
        assert_eq!(first.as_str().len(), 30);
        assert!(first < second);
    }

    #[test]
    fn test_parse() {
        let id: RequestId = "req_01h455vb4pex5vsknk084sn02q".parse().unwrap();
        assert_eq!(id.to_string(), "req_01h455vb4pex5vsknk084sn02q");

        assert!(matches!(
            "item_01h455vb4pex5vsknk084sn02q".parse::<RequestId>(),
            Err(RequestIdError::WrongPrefix(prefix)) if prefix == "item"
        ));
        assert!(matches!(
            "req_nope".parse::<RequestId>(),
            Err(RequestIdError::Malformed(_))
        ));
    }

    #[test]
    fn test_layer_generator() {
        let request = Request::builder().body(()).unwrap();
        let id = MakeTypedRequestId.make_request_id(&request).unwrap();
        let id = id.header_value().to_str().unwrap().to_string();
        assert!(id.parse::<RequestId>().is_ok());
    }
}
