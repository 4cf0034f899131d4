//! Registering viewsets on an axum router
//!
//! [`ViewRouter`] collects the route descriptors of every registered viewset, rejects
//! ambiguous registrations up front and finally produces a plain `axum::Router`.
//!
//! ```rust,ignore
//! let mut views = ViewRouter::new(responder);
//! views.register(&items, "/items")?;
//! views.register(&orders, "/orders")?;
//! let app: axum::Router = views.into_router();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use axum::{http::Method, routing::MethodRouter, Router};

use crate::error::{Error, Result};
use crate::problem::ErrorResponder;
use crate::route::{path_shape, validate_path, RouteDescriptor};
use crate::view::Viewset;

/// Route table under construction
#[derive(Debug)]
pub struct ViewRouter {
    responder: ErrorResponder,
    simplify_operation_ids: bool,
    routes: Vec<RouteDescriptor>,
}

impl ViewRouter {
    /// Empty table rendering failures through `responder`
    #[must_use]
    pub fn new(responder: ErrorResponder) -> Self {
        Self {
            responder,
            simplify_operation_ids: true,
            routes: Vec::new(),
        }
    }

    /// Keep operation ids as `{component}_{verb}` (default) or prefix them with the
    /// route path
    #[must_use]
    pub fn simplify_operation_ids(mut self, simplify: bool) -> Self {
        self.simplify_operation_ids = simplify;
        self
    }

    /// Register every route of `viewset` under `prefix`
    ///
    /// Nothing is registered when any route is rejected.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateOperationId`] when an operation id is already taken
    /// - [`Error::RouteConflict`] when a method is already bound on the same path
    ///   (parameter names are ignored in the comparison)
    /// - [`Error::InvalidRoute`] for a malformed path, or one that differs from an
    ///   earlier route only in parameter names, including routes of this viewset
    pub fn register(&mut self, viewset: &Viewset, prefix: &str) -> Result<&mut Self> {
        let mut routes = viewset.routes(prefix, &self.responder)?;
        if !self.simplify_operation_ids {
            for route in &mut routes {
                route.operation_id = format!("{}_{}", path_slug(&route.path), route.operation_id);
            }
        }

        let mut operation_ids: BTreeSet<&str> =
            self.routes.iter().map(|r| r.operation_id.as_str()).collect();
        let mut bound: BTreeSet<(String, &Method)> = self
            .routes
            .iter()
            .flat_map(|r| r.methods.iter().map(|m| (path_shape(&r.path), m)))
            .collect();
        let mut shapes: BTreeMap<String, &str> = self
            .routes
            .iter()
            .map(|r| (path_shape(&r.path), r.path.as_str()))
            .collect();

        for route in &routes {
            validate_path(&route.path)?;
            if !operation_ids.insert(route.operation_id.as_str()) {
                return Err(Error::DuplicateOperationId(route.operation_id.clone()));
            }
            for method in &route.methods {
                if !bound.insert((path_shape(&route.path), method)) {
                    return Err(Error::RouteConflict {
                        method: method.clone(),
                        path: route.path.clone(),
                    });
                }
            }
            let existing = *shapes
                .entry(path_shape(&route.path))
                .or_insert(route.path.as_str());
            if existing != route.path {
                return Err(Error::InvalidRoute {
                    path: route.path.clone(),
                    reason: format!("parameter names differ from `{existing}`"),
                });
            }
        }

        for route in &routes {
            tracing::debug!(
                path = %route.path,
                methods = ?route.methods,
                operation_id = %route.operation_id,
                status = route.status_code.as_u16(),
                "registering route"
            );
        }
        self.routes.extend(routes);
        Ok(self)
    }

    /// Builder-style [`register`](Self::register)
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn with_viewset(mut self, viewset: &Viewset, prefix: &str) -> Result<Self> {
        self.register(viewset, prefix)?;
        Ok(self)
    }

    /// Every registered route, in registration order
    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Responder shared with the app fallbacks
    #[must_use]
    pub fn responder(&self) -> &ErrorResponder {
        &self.responder
    }

    /// Hand every route to axum, merging methods that share a path
    #[must_use]
    pub fn into_router(self) -> Router {
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for route in self.routes {
            let handler = match by_path.remove(&route.path) {
                Some(existing) => existing.merge(route.handler),
                None => route.handler,
            };
            by_path.insert(route.path, handler);
        }
        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, handler)| router.route(&path, handler))
    }
}

fn path_slug(path: &str) -> String {
    let slug: String = path
        .chars()
        .filter(|c| !matches!(c, '{' | '}'))
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "root".to_string()
    } else {
        slug
    }
}
