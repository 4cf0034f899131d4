//! Route descriptors
//!
//! Every action a view provides resolves to one [`RouteDescriptor`]: the path, method,
//! operation id, human name, success status, response model and declared error shapes,
//! together with the bound axum handler.

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::{Method, StatusCode},
    routing::{MethodFilter, MethodRouter},
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::problem::{ErrorKind, ErrorShape};
use crate::schema::Schema;

static PATH_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap_or_else(|e| panic!("invalid regex: {e}"))
});

/// A CRUD action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// `GET P`
    List,
    /// `POST P`
    Create,
    /// `GET P/{id}`
    Retrieve,
    /// `PUT P/{id}`
    Update,
    /// `PATCH P/{id}`
    PartialUpdate,
    /// `DELETE P/{id}`
    Destroy,
}

impl Action {
    /// Every action in route order
    pub const ALL: [Action; 6] = [
        Self::List,
        Self::Create,
        Self::Retrieve,
        Self::Update,
        Self::PartialUpdate,
        Self::Destroy,
    ];

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::List | Self::Retrieve => Method::GET,
            Self::Create => Method::POST,
            Self::Update => Method::PUT,
            Self::PartialUpdate => Method::PATCH,
            Self::Destroy => Method::DELETE,
        }
    }

    /// Verb used in operation ids
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Retrieve => "get",
            Self::Update => "update",
            Self::PartialUpdate => "patch",
            Self::Destroy => "delete",
        }
    }

    /// Verb used in human route names
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Create => "Create",
            Self::Retrieve => "Get",
            Self::Update => "Update",
            Self::PartialUpdate => "Partial update",
            Self::Destroy => "Delete",
        }
    }

    /// Success status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Create => StatusCode::CREATED,
            Self::Destroy => StatusCode::NO_CONTENT,
            _ => StatusCode::OK,
        }
    }

    /// Whether the action addresses one instance (uses the detail route)
    #[must_use]
    pub const fn is_detail(&self) -> bool {
        matches!(
            self,
            Self::Retrieve | Self::Update | Self::PartialUpdate | Self::Destroy
        )
    }

    /// Errors every view providing the action declares
    #[must_use]
    pub const fn default_errors(&self) -> &'static [ErrorKind] {
        match self {
            Self::List | Self::Destroy => &[],
            Self::Retrieve => &[ErrorKind::NotFound],
            Self::Create => &[ErrorKind::Conflict, ErrorKind::UnprocessableEntity],
            Self::Update | Self::PartialUpdate => {
                &[ErrorKind::NotFound, ErrorKind::UnprocessableEntity]
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Retrieve => "retrieve",
            Self::Update => "update",
            Self::PartialUpdate => "partial_update",
            Self::Destroy => "destroy",
        })
    }
}

/// Lower-case a component name and replace spaces with underscores
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Concatenate a prefix and a suffix into a route path starting with `/`
#[must_use]
pub fn join_path(prefix: &str, suffix: &str) -> String {
    let joined = format!("{}{}", prefix.trim_end_matches('/'), suffix);
    if joined.is_empty() {
        "/".to_string()
    } else if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Names of the `{param}` segments of a path template
#[must_use]
pub fn path_params(path: &str) -> Vec<String> {
    PATH_PARAM
        .captures_iter(path)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Path with every parameter name erased, used to detect routes that only differ in
/// parameter names
#[must_use]
pub fn path_shape(path: &str) -> String {
    PATH_PARAM.replace_all(path, "{}").into_owned()
}

/// Check a path template
///
/// # Errors
///
/// [`Error::InvalidRoute`] when the path does not start with `/`, has stray braces or
/// repeats a parameter name.
pub fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidRoute {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if !path.starts_with('/') {
        return Err(invalid("must start with `/`"));
    }
    let stripped = PATH_PARAM.replace_all(path, "");
    if stripped.contains('{') || stripped.contains('}') {
        return Err(invalid("malformed `{param}` segment"));
    }
    let mut params = path_params(path);
    let count = params.len();
    params.sort();
    params.dedup();
    if params.len() != count {
        return Err(invalid("repeated parameter name"));
    }
    Ok(())
}

/// `MethodFilter` for an HTTP method axum can route
#[must_use]
pub fn method_filter(method: &Method) -> Option<MethodFilter> {
    match *method {
        Method::GET => Some(MethodFilter::GET),
        Method::POST => Some(MethodFilter::POST),
        Method::PUT => Some(MethodFilter::PUT),
        Method::PATCH => Some(MethodFilter::PATCH),
        Method::DELETE => Some(MethodFilter::DELETE),
        Method::HEAD => Some(MethodFilter::HEAD),
        Method::OPTIONS => Some(MethodFilter::OPTIONS),
        Method::TRACE => Some(MethodFilter::TRACE),
        _ => None,
    }
}

/// What produced a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// One of the CRUD actions
    Action(Action),
    /// A custom route, by name
    Custom(String),
}

/// Response body description
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseModel {
    /// Schema of one item
    pub schema: Schema,
    /// Body is a list of `schema`
    pub many: bool,
}

/// Resolved route for one action of one view
pub struct RouteDescriptor {
    /// Full path template
    pub path: String,
    /// HTTP methods
    pub methods: Vec<Method>,
    /// Unique operation id
    pub operation_id: String,
    /// Human label
    pub name: String,
    /// Success status
    pub status_code: StatusCode,
    /// Response body description
    pub response_model: Option<ResponseModel>,
    /// Declared error shapes by status
    pub declared_errors: BTreeMap<u16, ErrorShape>,
    /// Origin of the route
    pub kind: RouteKind,
    /// Bound handler
    pub handler: MethodRouter,
}

impl RouteDescriptor {
    /// The CRUD action, if this is one
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        match self.kind {
            RouteKind::Action(action) => Some(action),
            RouteKind::Custom(_) => None,
        }
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("operation_id", &self.operation_id)
            .field("name", &self.name)
            .field("status_code", &self.status_code)
            .field("response_model", &self.response_model)
            .field("declared_errors", &self.declared_errors.keys().collect::<Vec<_>>())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
