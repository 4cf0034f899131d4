//! Status → error shape registry
//!
//! The registry is built once by the application's composition root and shared by
//! reference (usually behind an `Arc`) with every view. Nothing here is global.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use axum::http::StatusCode;

use super::kind::{ErrorKind, ErrorShape};

/// A Rust error type that renders with a registered status
#[derive(Debug, Clone)]
struct ErrorMapping {
    type_name: &'static str,
    status: StatusCode,
    matches: fn(&(dyn StdError + 'static)) -> bool,
}

fn is_error<E: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    err.is::<E>()
}

/// Maps HTTP statuses to problem shapes and error types to statuses
///
/// `ErrorRegistry::default()` holds every [`ErrorKind`]; [`ErrorRegistry::empty`] holds
/// nothing and answers every lookup with the `about:blank` shape.
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    shapes: BTreeMap<u16, ErrorShape>,
    mappings: Vec<ErrorMapping>,
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ErrorRegistry {
    /// A registry without any shapes
    #[must_use]
    pub fn empty() -> Self {
        Self {
            shapes: BTreeMap::new(),
            mappings: Vec::new(),
        }
    }

    /// A registry holding the shape of every built-in error kind
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in ErrorKind::ALL {
            registry.register(kind.shape());
        }
        registry
    }

    /// Register a shape for its status. A later registration for the same status wins.
    pub fn register(&mut self, shape: ErrorShape) -> &mut Self {
        self.shapes.insert(shape.status.as_u16(), shape);
        self
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with_shape(mut self, shape: ErrorShape) -> Self {
        self.register(shape);
        self
    }

    /// Shape registered for a status, if any
    #[must_use]
    pub fn get(&self, status: StatusCode) -> Option<&ErrorShape> {
        self.shapes.get(&status.as_u16())
    }

    /// Shape for a status, falling back to the generic `about:blank` shape
    #[must_use]
    pub fn lookup(&self, status: StatusCode) -> ErrorShape {
        self.get(status)
            .cloned()
            .unwrap_or_else(|| ErrorShape::generic(status))
    }

    /// All registered shapes in status order
    pub fn shapes(&self) -> impl Iterator<Item = &ErrorShape> {
        self.shapes.values()
    }

    /// Render occurrences of error type `E` with `status`
    ///
    /// The error is matched anywhere in an `anyhow` chain, so context added on top of it
    /// does not hide it. Mappings are checked in registration order.
    pub fn register_error<E>(&mut self, status: StatusCode) -> &mut Self
    where
        E: StdError + 'static,
    {
        self.mappings.push(ErrorMapping {
            type_name: std::any::type_name::<E>(),
            status,
            matches: is_error::<E>,
        });
        self
    }

    /// Builder form of [`register_error`](Self::register_error)
    #[must_use]
    pub fn map_error<E>(mut self, status: StatusCode) -> Self
    where
        E: StdError + 'static,
    {
        self.register_error::<E>(status);
        self
    }

    /// Status mapped for an error, if its chain contains a registered error type
    #[must_use]
    pub fn status_for(&self, err: &anyhow::Error) -> Option<StatusCode> {
        self.mappings.iter().find_map(|mapping| {
            err.chain().any(|cause| (mapping.matches)(cause)).then(|| {
                tracing::trace!(error_type = mapping.type_name, "matched error mapping");
                mapping.status
            })
        })
    }
}
