//! Viewsets: a group of action routes under one prefix

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::problem::ErrorResponder;
use crate::route::{Action, RouteDescriptor};

use super::actions::{
    CreateAction, DestroyAction, ListAction, PartialUpdateAction, RetrieveAction, UpdateAction,
};
use super::config::ViewConfig;
use super::custom::CustomRoute;
use super::dispatch::RouteScope;
use super::mixins::{
    CreateMixin, DestroyMixin, ListMixin, PartialUpdateMixin, RetrieveMixin, RouteProvider,
    UpdateMixin,
};

/// Actions and custom routes of one component
///
/// Built with [`Viewset::builder`] or one of the presets, then registered on a
/// [`ViewRouter`](crate::router::ViewRouter) under a prefix.
pub struct Viewset {
    config: Arc<ViewConfig>,
    providers: Vec<Box<dyn RouteProvider>>,
}

impl Viewset {
    /// Empty builder; add actions and custom routes, then [`build`](ViewsetBuilder::build)
    #[must_use]
    pub fn builder(config: ViewConfig) -> ViewsetBuilder {
        ViewsetBuilder {
            config,
            providers: Vec::new(),
            duplicate: None,
        }
    }

    /// List and retrieve
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn read_only<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: ListAction + RetrieveAction,
    {
        Self::builder(config)
            .list(Arc::clone(&view))
            .retrieve(view)
            .build()
    }

    /// List and create
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn list_create<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: ListAction + CreateAction,
    {
        Self::builder(config)
            .list(Arc::clone(&view))
            .create(view)
            .build()
    }

    /// Retrieve and update
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn retrieve_update<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: RetrieveAction + UpdateAction,
    {
        Self::builder(config)
            .retrieve(Arc::clone(&view))
            .update(view)
            .build()
    }

    /// Retrieve, update and destroy
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn retrieve_update_destroy<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: RetrieveAction + UpdateAction + DestroyAction,
    {
        Self::builder(config)
            .retrieve(Arc::clone(&view))
            .update(Arc::clone(&view))
            .destroy(view)
            .build()
    }

    /// Every action except create and partial update
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn list_retrieve_update_destroy<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: ListAction + RetrieveAction + UpdateAction + DestroyAction,
    {
        Self::builder(config)
            .list(Arc::clone(&view))
            .retrieve(Arc::clone(&view))
            .update(Arc::clone(&view))
            .destroy(view)
            .build()
    }

    /// List, create and destroy
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn list_create_destroy<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: ListAction + CreateAction + DestroyAction,
    {
        Self::builder(config)
            .list(Arc::clone(&view))
            .create(Arc::clone(&view))
            .destroy(view)
            .build()
    }

    /// List, create, retrieve, update and destroy
    ///
    /// Add partial update with [`ViewsetBuilder::partial_update`] on a builder when the
    /// view supports it.
    ///
    /// # Errors
    ///
    /// See [`ViewsetBuilder::build`].
    pub fn api<V>(config: ViewConfig, view: Arc<V>) -> Result<Self>
    where
        V: ListAction + CreateAction + RetrieveAction + UpdateAction + DestroyAction,
    {
        Self::api_builder(config, view).build()
    }

    /// Builder preloaded with the [`api`](Self::api) actions
    #[must_use]
    pub fn api_builder<V>(config: ViewConfig, view: Arc<V>) -> ViewsetBuilder
    where
        V: ListAction + CreateAction + RetrieveAction + UpdateAction + DestroyAction,
    {
        Self::builder(config)
            .list(Arc::clone(&view))
            .create(Arc::clone(&view))
            .retrieve(Arc::clone(&view))
            .update(Arc::clone(&view))
            .destroy(view)
    }

    /// Configuration shared by every route
    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Provided CRUD actions in route order
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.providers.iter().filter_map(|p| p.action()).collect()
    }

    /// Resolve every route under `prefix`: CRUD actions first, in route order, then
    /// custom routes in declaration order
    ///
    /// # Errors
    ///
    /// A route could not be built.
    pub fn routes(&self, prefix: &str, responder: &ErrorResponder) -> Result<Vec<RouteDescriptor>> {
        let scope = RouteScope::new(&self.config, responder, prefix);
        let mut routes = Vec::new();
        for provider in &self.providers {
            routes.extend(provider.describe(&scope)?);
        }
        Ok(routes)
    }
}

impl fmt::Debug for Viewset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewset")
            .field("component", &self.config.component_name)
            .field("actions", &self.actions())
            .finish_non_exhaustive()
    }
}

/// Accumulates action providers for a [`Viewset`]
pub struct ViewsetBuilder {
    config: ViewConfig,
    providers: Vec<Box<dyn RouteProvider>>,
    duplicate: Option<Action>,
}

impl ViewsetBuilder {
    /// `GET {prefix}`
    #[must_use]
    pub fn list<V: ListAction>(self, view: Arc<V>) -> Self {
        self.provide(ListMixin(view))
    }

    /// `GET {prefix}{detail_route}`
    #[must_use]
    pub fn retrieve<V: RetrieveAction>(self, view: Arc<V>) -> Self {
        self.provide(RetrieveMixin(view))
    }

    /// `POST {prefix}`
    #[must_use]
    pub fn create<V: CreateAction>(self, view: Arc<V>) -> Self {
        self.provide(CreateMixin(view))
    }

    /// `PUT {prefix}{detail_route}`
    #[must_use]
    pub fn update<V: UpdateAction>(self, view: Arc<V>) -> Self {
        self.provide(UpdateMixin(view))
    }

    /// `PATCH {prefix}{detail_route}`
    #[must_use]
    pub fn partial_update<V: PartialUpdateAction>(self, view: Arc<V>) -> Self {
        self.provide(PartialUpdateMixin(view))
    }

    /// `DELETE {prefix}{detail_route}`
    #[must_use]
    pub fn destroy<V: DestroyAction>(self, view: Arc<V>) -> Self {
        self.provide(DestroyMixin(view))
    }

    /// Add a custom route, emitted after the CRUD routes
    #[must_use]
    pub fn route(self, route: CustomRoute) -> Self {
        self.provide(route)
    }

    /// Add any route provider
    #[must_use]
    pub fn provide(mut self, provider: impl RouteProvider + 'static) -> Self {
        if let Some(action) = provider.action() {
            if self.providers.iter().any(|p| p.action() == Some(action)) {
                self.duplicate.get_or_insert(action);
            }
        }
        self.providers.push(Box::new(provider));
        self
    }

    /// Finish the viewset
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateAction`] when an action was provided twice
    /// - [`Error::EmptyView`] when nothing was provided
    pub fn build(self) -> Result<Viewset> {
        if let Some(action) = self.duplicate {
            return Err(Error::DuplicateAction {
                component: self.config.component_name,
                action,
            });
        }
        if self.providers.is_empty() {
            return Err(Error::EmptyView(self.config.component_name));
        }

        let mut providers = self.providers;
        // stable: custom routes (no action) keep their order after the actions
        providers.sort_by_key(|p| p.action().map_or(usize::MAX, |a| a as usize));

        tracing::debug!(
            component = %self.config.component_name,
            routes = providers.len(),
            "viewset built"
        );
        Ok(Viewset {
            config: Arc::new(self.config),
            providers,
        })
    }
}
