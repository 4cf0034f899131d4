//! Token pagination for list actions
//!
//! A list action declares [`PageQuery`] as its query type and returns a [`Page`].
//! Page tokens are opaque to clients: they travel as URL-safe base64 and are handed
//! back to the action decoded.
//!
//! ```rust,ignore
//! impl ListAction for Orders {
//!     type Query = PageQuery;
//!     type Output = Page<Order>;
//!
//!     async fn list(&self, _ctx: &mut ViewContext, query: PageQuery) -> anyhow::Result<Page<Order>> {
//!         let query = query.bounded(&self.pagination)?;
//!         let (items, next) = self.store.scan(query.page.as_ref(), query.page_size).await?;
//!         Ok(Page::new(items).with_next_page(next))
//!     }
//! }
//! ```

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::PaginationConfig;
use crate::problem::{ApiError, FieldViolation};

/// Position in a result set, opaque to clients
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(position: impl Into<String>) -> Self {
        Self(position.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire form
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }

    /// Decode the wire form; text that is not valid base64 of UTF-8 is taken as is
    #[must_use]
    pub fn decode(wire: &str) -> Self {
        let decoded = URL_SAFE_NO_PAD
            .decode(wire.trim_end_matches('='))
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());
        Self(decoded.unwrap_or_else(|| wire.to_string()))
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PageToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for PageToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = String::deserialize(deserializer)?;
        Ok(Self::decode(&wire))
    }
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<PageToken>,
    pub previous_page: Option<PageToken>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
            previous_page: None,
        }
    }

    #[must_use]
    pub fn with_next_page(mut self, token: Option<PageToken>) -> Self {
        self.next_page = token;
        self
    }

    #[must_use]
    pub fn with_previous_page(mut self, token: Option<PageToken>) -> Self {
        self.previous_page = token;
        self
    }
}

/// Query parameters of a paginated list
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PageQuery {
    pub page_size: Option<u32>,
    pub page: Option<PageToken>,
}

/// Query with the page size resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedPageQuery {
    pub page_size: u32,
    pub page: Option<PageToken>,
}

impl PageQuery {
    /// Resolve the page size against the configured bounds
    ///
    /// # Errors
    ///
    /// 422 located at `query.page_size` when the size is 0 or above the maximum.
    pub fn bounded(self, bounds: &PaginationConfig) -> Result<BoundedPageQuery, ApiError> {
        let page_size = self
            .page_size
            .unwrap_or_else(|| bounds.default_page_size.min(bounds.max_page_size));

        if page_size == 0 || page_size > bounds.max_page_size {
            return Err(ApiError::validation(vec![FieldViolation::new(
                ["query", "page_size"],
                format!(
                    "ensure this value is between 1 and {}",
                    bounds.max_page_size
                ),
                "value_error.number.not_in_range",
            )]));
        }

        Ok(BoundedPageQuery {
            page_size,
            page: self.page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bounds(max: u32) -> PaginationConfig {
        PaginationConfig {
            max_page_size: max,
            default_page_size: 50,
        }
    }

    #[test]
    fn test_token_wire_form() {
        let token = PageToken::new("offset:100");
        let wire = serde_json::to_value(&token).unwrap();
        assert_eq!(wire, json!(URL_SAFE_NO_PAD.encode("offset:100")));

        let back: PageToken = serde_json::from_value(wire).unwrap();
        assert_eq!(back.as_str(), "offset:100");
    }

    #[test]
    fn test_token_decode_is_lenient() {
        assert_eq!(PageToken::decode("not base64!").as_str(), "not base64!");
        let padded = base64::engine::general_purpose::URL_SAFE.encode("cursor-7");
        assert_eq!(PageToken::decode(&padded).as_str(), "cursor-7");
    }

    #[test]
    fn test_page_serializes_tokens() {
        let page = Page::new(vec![1, 2]).with_next_page(Some(PageToken::new("2")));
        let body = serde_json::to_value(&page).unwrap();
        assert_eq!(body["items"], json!([1, 2]));
        assert_eq!(body["next_page"], json!(URL_SAFE_NO_PAD.encode("2")));
        assert_eq!(body["previous_page"], json!(null));
    }

    #[test]
    fn test_query_from_url() {
        let wire = URL_SAFE_NO_PAD.encode("k=9");
        let query: PageQuery =
            serde_json::from_value(json!({"page_size": 10, "page": wire})).unwrap();
        assert_eq!(query.page_size, Some(10));
        assert_eq!(query.page.unwrap().as_str(), "k=9");
    }

    #[test]
    fn test_bounds() {
        let ok = PageQuery {
            page_size: Some(500),
            page: None,
        };
        assert_eq!(ok.bounded(&bounds(500)).unwrap().page_size, 500);

        assert_eq!(PageQuery::default().bounded(&bounds(20)).unwrap().page_size, 20);

        for size in [0, 501] {
            let err = PageQuery {
                page_size: Some(size),
                page: None,
            }
            .bounded(&bounds(500))
            .unwrap_err();
            assert_eq!(err.status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(err.errors.unwrap()[0].loc, ["query", "page_size"]);
        }
    }
}
