//! # restviews
//!
//! Class-style REST views and viewsets for axum. A view implements only the actions it
//! supports (list, create, retrieve, update, partial update, destroy); routes, HTTP
//! methods, status codes, operation ids, response shaping and problem-details error
//! bodies follow from that choice.
//!
//! ## Features
//!
//! - **Views**: one trait per action, async or blocking, composed into viewsets
//! - **Generic views**: CRUD over a repository with schema-validated input
//! - **Errors**: RFC 9457 problem details for declared, validation and unhandled errors
//! - **Routing**: collision-checked registration onto a plain `axum::Router`
//! - **Middleware stack**: request ids, tracing, compression, timeouts, panic recovery
//! - **Health checks**: aggregated probe with a deadline
//!
//! ## Example
//!
//! ```rust,no_run
//! use restviews::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let item = Schema::new("Item")
//!         .field(Field::new("id", FieldType::Uuid))
//!         .field(Field::new("name", FieldType::String));
//!     let items = GenericView::new(item, RepositorySource::shared(MyItems::default()))
//!         .api(ViewConfig::new("Item"))?;
//!
//!     let responder = error_responder(&config, ErrorRegistry::builtin());
//!     let views = view_router(&config, responder).with_viewset(&items, "/items")?;
//!
//!     let app = configure_app(views, &config, None)?;
//!     Server::new(config).serve(app).await
//! }
//! # #[derive(Default)] struct MyItems;
//! # impl Repository for MyItems {
//! #     type Entity = Record;
//! #     async fn list(&self, _: Record) -> anyhow::Result<Vec<Record>> { Ok(vec![]) }
//! #     async fn retrieve(&self, _: Record) -> anyhow::Result<Option<Record>> { Ok(None) }
//! #     async fn create(&self, e: Record, _: Record) -> anyhow::Result<Option<Record>> { Ok(Some(e)) }
//! #     async fn update(&self, e: Record, _: Record) -> anyhow::Result<Option<Record>> { Ok(Some(e)) }
//! #     async fn delete(&self, _: Record) -> anyhow::Result<()> { Ok(()) }
//! # }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod generic;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod pagination;
pub mod problem;
pub mod route;
pub mod router;
pub mod schema;
pub mod serializer;
pub mod server;
pub mod view;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::{configure_app, error_responder, view_router};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::generic::{
        GenericSchemas, GenericView, Raise, Raises, Repository, RepositorySource, SyncRepository,
    };
    pub use crate::health::{FnIndicator, HealthCheck, HealthIndicator};
    pub use crate::ids::RequestId;
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::pagination::{Page, PageQuery, PageToken};
    pub use crate::problem::{ApiError, ErrorKind, ErrorRegistry, ErrorResponder, FieldViolation};
    pub use crate::route::Action;
    pub use crate::router::ViewRouter;
    pub use crate::schema::{Field, FieldType, Record, Schema};
    pub use crate::serializer::SerializerOptions;
    pub use crate::server::Server;
    pub use crate::view::{
        Blocking, BlockingCreate, BlockingDestroy, BlockingList, BlockingPartialUpdate,
        BlockingRetrieve, BlockingUpdate, CreateAction, CustomRoute, DestroyAction, ListAction,
        NoParams, PartialUpdateAction, RetrieveAction, RouteInput, UpdateAction, ViewConfig,
        ViewContext, Viewset,
    };

    pub use axum::http::StatusCode;
}
