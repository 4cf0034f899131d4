//! Declared repository errors
//!
//! A generic view converts the repository error types it declares into structured
//! [`ApiError`]s. Undeclared errors pass through untouched and reach the dispatch
//! fallback.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;

use axum::http::StatusCode;

use crate::problem::ApiError;

const DEFAULT_DETAIL: &str = "Something went wrong";

/// How one declared error type renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raise {
    detail: Option<String>,
    status: StatusCode,
    title: Option<String>,
}

impl Default for Raise {
    fn default() -> Self {
        Self {
            detail: None,
            status: StatusCode::BAD_REQUEST,
            title: None,
        }
    }
}

impl Raise {
    /// 400 with the default detail
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

struct Entry {
    type_name: &'static str,
    matches: fn(&anyhow::Error) -> bool,
    raise: Raise,
}

/// Error type → [`Raise`] table of a generic view
#[derive(Default)]
pub struct Raises {
    entries: Vec<Entry>,
}

fn is<E: StdError + Send + Sync + 'static>(err: &anyhow::Error) -> bool {
    err.downcast_ref::<E>().is_some()
}

fn short_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl Raises {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `E` with the default rendering: 400, "Something went wrong", titled by the
    /// type name
    #[must_use]
    pub fn catch<E>(self) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.catch_with::<E>(Raise::default())
    }

    /// Declare `E` with an explicit rendering; a later declaration of the same type wins
    #[must_use]
    pub fn catch_with<E>(mut self, raise: Raise) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let type_name = type_name::<E>();
        self.entries.retain(|entry| entry.type_name != type_name);
        self.entries.push(Entry {
            type_name,
            matches: is::<E>,
            raise,
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert a declared error into an [`ApiError`]; anything else is returned unchanged
    #[must_use]
    pub fn convert(&self, err: anyhow::Error) -> anyhow::Error {
        let Some(entry) = self.entries.iter().find(|entry| (entry.matches)(&err)) else {
            return err;
        };
        let raise = &entry.raise;
        let title = raise
            .title
            .clone()
            .unwrap_or_else(|| short_name(entry.type_name).to_string());
        let detail = raise.detail.as_deref().unwrap_or(DEFAULT_DETAIL);

        tracing::debug!(
            error = %err,
            declared = entry.type_name,
            status = raise.status.as_u16(),
            "declared repository error"
        );
        ApiError::new(raise.status, detail).with_title(title).into()
    }
}

impl fmt::Debug for Raises {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| (entry.type_name, &entry.raise)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("row is locked")]
    struct RowLocked;

    #[derive(Debug, thiserror::Error)]
    #[error("duplicate key")]
    struct DuplicateKey;

    fn api(err: anyhow::Error) -> ApiError {
        err.downcast::<ApiError>().unwrap()
    }

    #[test]
    fn test_default_rendering() {
        let raises = Raises::new().catch::<RowLocked>();
        let err = api(raises.convert(RowLocked.into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Something went wrong");
        assert_eq!(err.title(), "RowLocked");
    }

    #[test]
    fn test_explicit_rendering() {
        let raises = Raises::new().catch_with::<DuplicateKey>(
            Raise::new()
                .status(StatusCode::CONFLICT)
                .detail("Item already exists"),
        );
        let err = api(raises.convert(DuplicateKey.into()));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.detail, "Item already exists");
    }

    #[test]
    fn test_undeclared_errors_pass_through() {
        let raises = Raises::new().catch::<RowLocked>();
        let err = raises.convert(DuplicateKey.into());
        assert!(err.downcast_ref::<DuplicateKey>().is_some());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("my_crate::db::RowLocked"), "RowLocked");
        assert_eq!(short_name("a::Wrapper<b::Inner>"), "Wrapper");
    }
}
