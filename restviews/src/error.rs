//! Startup and registration errors
//!
//! Request-time failures are [`ApiError`](crate::problem::ApiError) values rendered as
//! problem-details bodies. This module covers everything that can go wrong before the
//! first request is served: loading configuration, composing viewsets and mounting
//! them on a router.

use http::Method;
use thiserror::Error;

use crate::route::Action;

/// Result type alias using the crate's error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or assembling an application
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The same action was contributed twice to one viewset
    #[error("Viewset `{component}` already provides the `{action}` action")]
    DuplicateAction {
        /// Component name of the viewset
        component: String,
        /// The action contributed twice
        action: Action,
    },

    /// Two routes in one router share an operation id
    #[error("Duplicate operation id `{0}`")]
    DuplicateOperationId(String),

    /// Two routes in one router answer the same method on the same path
    #[error("Route conflict: {method} {path} is already registered")]
    RouteConflict {
        /// HTTP method
        method: Method,
        /// Full route path
        path: String,
    },

    /// A view without any action or custom route was registered
    #[error("View `{0}` does not define any route")]
    EmptyView(String),

    /// A route path template is malformed
    #[error("Invalid route `{path}`: {reason}")]
    InvalidRoute {
        /// Offending path template
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
