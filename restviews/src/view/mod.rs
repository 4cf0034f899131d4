//! Class-style views
//!
//! A view is a plain struct implementing action traits ([`ListAction`], [`RetrieveAction`],
//! …). A [`Viewset`] collects the actions of one component and generates a route for
//! each, with the conventional method, path, status, operation id and error set:
//!
//! | action         | method | path       | status |
//! |----------------|--------|------------|--------|
//! | list           | GET    | `P`        | 200    |
//! | create         | POST   | `P`        | 201    |
//! | retrieve       | GET    | `P/{id}`   | 200    |
//! | update         | PUT    | `P/{id}`   | 200    |
//! | partial update | PATCH  | `P/{id}`   | 200    |
//! | destroy        | DELETE | `P/{id}`   | 204    |

mod actions;
mod config;
mod context;
mod custom;
mod dispatch;
mod mixins;
mod viewset;

pub use actions::{
    Blocking, BlockingCreate, BlockingDestroy, BlockingList, BlockingPartialUpdate,
    BlockingRetrieve, BlockingUpdate, CreateAction, DestroyAction, ListAction, NoParams,
    PartialUpdateAction, RetrieveAction, UpdateAction,
};
pub use config::ViewConfig;
pub use context::ViewContext;
pub use custom::{CustomRoute, RouteInput};
pub use dispatch::{Dispatcher, RouteScope, Source};
pub use mixins::RouteProvider;
pub use viewset::{Viewset, ViewsetBuilder};
