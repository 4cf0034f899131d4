//! Generic views: CRUD delegated to a repository
//!
//! A [`GenericView`] validates the primary key, query parameters and body against
//! schemas derived from one base schema, then hands validated records to a
//! [`Repository`]. Repository errors declared in [`Raises`] become structured
//! responses; anything else reaches the 500 fallback.

mod raises;
mod repository;
mod view;

pub use raises::{Raise, Raises};
pub use repository::{Repository, RepositorySource, SyncRepository};
pub use view::{GenericSchemas, GenericView};
