//! Problem-details errors
//!
//! - [`ErrorKind`] / [`ErrorShape`]: the built-in taxonomy and its wire constants
//! - [`ErrorRegistry`]: status → shape lookup, plus error type → status mappings
//! - [`ApiError`]: what action code returns to stop with a structured response
//! - [`ErrorDetails`]: the serialized body
//! - [`ErrorResponder`]: classification and rendering at the dispatch boundary

mod api_error;
mod details;
mod kind;
mod registry;
mod responder;

pub use api_error::ApiError;
pub use details::{ErrorDetails, FieldViolation, APPLICATION_PROBLEM_JSON};
pub use kind::{default_title, ErrorKind, ErrorShape, ABOUT_BLANK};
pub use registry::ErrorRegistry;
pub use responder::ErrorResponder;
