//! Built-in error kinds and the shapes they register

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;

const RFC_BASE: &str = "https://datatracker.ietf.org/doc/html/";

/// Default `type` for statuses without a registered shape
pub const ABOUT_BLANK: &str = "about:blank";

/// Title used when neither the error nor the registry provides one
///
/// Server errors read "Internal Server Error", a bare 400 reads "Bad Request" and
/// everything else falls back to "Something went wrong".
#[must_use]
pub fn default_title(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "Internal Server Error"
    } else if status == StatusCode::BAD_REQUEST {
        "Bad Request"
    } else {
        "Something went wrong"
    }
}

/// The static part of a problem-details body: `type`, `title` and `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorShape {
    /// URI identifying the problem type
    pub type_uri: Cow<'static, str>,
    /// Short human-readable summary
    pub title: Cow<'static, str>,
    /// HTTP status
    pub status: StatusCode,
}

impl ErrorShape {
    /// Create a shape
    pub fn new(
        status: StatusCode,
        type_uri: impl Into<Cow<'static, str>>,
        title: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            type_uri: type_uri.into(),
            title: title.into(),
            status,
        }
    }

    /// The `about:blank` shape used for statuses nobody registered
    #[must_use]
    pub fn generic(status: StatusCode) -> Self {
        Self::new(status, ABOUT_BLANK, default_title(status))
    }
}

/// Concrete error kinds with a fixed status, title and type URI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 422
    UnprocessableEntity,
    /// 429
    TooManyRequests,
    /// 500
    InternalServerError,
    /// 503
    ServiceUnavailable,
}

impl ErrorKind {
    /// Every built-in kind, in status order
    pub const ALL: [ErrorKind; 9] = [
        Self::BadRequest,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::UnprocessableEntity,
        Self::TooManyRequests,
        Self::InternalServerError,
        Self::ServiceUnavailable,
    ];

    /// HTTP status for this kind
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Fixed title for this kind
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Conflict => "Conflict",
            Self::UnprocessableEntity => "Unprocessable Entity",
            Self::TooManyRequests => "Too Many Requests",
            Self::InternalServerError => "Internal Server Error",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }

    fn rfc_section(&self) -> &'static str {
        match self {
            Self::BadRequest => "rfc7231#section-6.5.1",
            Self::Unauthorized => "rfc7235#section-3.1",
            Self::Forbidden => "rfc7231#section-6.5.3",
            Self::NotFound => "rfc7231#section-6.5.4",
            Self::Conflict => "rfc7231#section-6.5.8",
            Self::UnprocessableEntity => "rfc4918#section-11.2",
            Self::TooManyRequests => "rfc6585#section-4",
            Self::InternalServerError => "rfc7231#section-6.6.1",
            Self::ServiceUnavailable => "rfc7231#section-6.6.4",
        }
    }

    /// Type URI pointing at the RFC section defining the status
    #[must_use]
    pub fn type_uri(&self) -> String {
        format!("{RFC_BASE}{}", self.rfc_section())
    }

    /// The shape this kind registers
    #[must_use]
    pub fn shape(&self) -> ErrorShape {
        ErrorShape::new(self.status(), self.type_uri(), self.title())
    }

    /// Kind matching a status, if it is one of the built-ins
    #[must_use]
    pub fn from_status(status: StatusCode) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.status() == status)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title_table() {
        assert_eq!(default_title(StatusCode::INTERNAL_SERVER_ERROR), "Internal Server Error");
        assert_eq!(default_title(StatusCode::BAD_GATEWAY), "Internal Server Error");
        assert_eq!(default_title(StatusCode::BAD_REQUEST), "Bad Request");
        assert_eq!(default_title(StatusCode::IM_A_TEAPOT), "Something went wrong");
    }

    #[test]
    fn test_not_found_shape() {
        let shape = ErrorKind::NotFound.shape();
        assert_eq!(shape.status, StatusCode::NOT_FOUND);
        assert_eq!(shape.title, "Not Found");
        assert_eq!(
            shape.type_uri,
            "https://datatracker.ietf.org/doc/html/rfc7231#section-6.5.4"
        );
    }

    #[test]
    fn test_from_status() {
        assert_eq!(ErrorKind::from_status(StatusCode::CONFLICT), Some(ErrorKind::Conflict));
        assert_eq!(ErrorKind::from_status(StatusCode::IM_A_TEAPOT), None);
    }

    #[test]
    fn test_generic_shape() {
        let shape = ErrorShape::generic(StatusCode::IM_A_TEAPOT);
        assert_eq!(shape.type_uri, ABOUT_BLANK);
        assert_eq!(shape.title, "Something went wrong");
    }
}
