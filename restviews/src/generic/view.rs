//! Repository-backed view

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::problem::{ApiError, FieldViolation};
use crate::route::{path_params, Action};
use crate::schema::{derive_schema, id_schema, new_uuid, DumpOptions, FieldType, InputMode, Record, Schema};
use crate::view::{
    CreateAction, DestroyAction, ListAction, PartialUpdateAction, RetrieveAction, UpdateAction,
    ViewConfig, ViewContext, Viewset, ViewsetBuilder,
};

use super::raises::Raises;
use super::repository::{Repository, RepositorySource};

/// Request schemas of a generic view
///
/// Create, update and partial-update schemas are derived from the base schema unless set
/// explicitly:
///
/// - create: every base field; uuid primary-key fields get a fresh-UUID default
/// - update: every base field except the primary key
/// - partial update: the update schema with every field optional and no defaults
#[derive(Debug, Clone)]
pub struct GenericSchemas {
    base: Schema,
    pk: Schema,
    create: Option<Schema>,
    update: Option<Schema>,
    partial_update: Option<Schema>,
    params: BTreeMap<Action, Schema>,
    default_params: Schema,
}

impl GenericSchemas {
    /// Schemas around `base` with the default `{id: uuid}` primary key
    #[must_use]
    pub fn new(base: Schema) -> Self {
        Self {
            base,
            pk: id_schema(),
            create: None,
            update: None,
            partial_update: None,
            params: BTreeMap::new(),
            default_params: Schema::new("Params"),
        }
    }

    #[must_use]
    pub fn base(&self) -> &Schema {
        &self.base
    }

    #[must_use]
    pub fn pk(&self) -> &Schema {
        &self.pk
    }

    fn pk_names(&self) -> BTreeSet<String> {
        self.pk.field_names().map(str::to_string).collect()
    }

    /// Body schema of create
    #[must_use]
    pub fn create(&self) -> Schema {
        if let Some(schema) = &self.create {
            return schema.clone();
        }
        let derived = derive_schema(&self.base, &BTreeSet::new(), false)
            .named(format!("{}Create", self.base.name()));
        self.pk
            .fields()
            .iter()
            .filter(|pk| pk.ty == FieldType::Uuid)
            .filter_map(|pk| derived.get(&pk.name).cloned())
            .fold(derived.clone(), |schema, field| {
                schema.field(field.with_default_factory(new_uuid))
            })
    }

    /// Body schema of update
    #[must_use]
    pub fn update(&self) -> Schema {
        match &self.update {
            Some(schema) => schema.clone(),
            None => derive_schema(&self.base, &self.pk_names(), false)
                .named(format!("{}Update", self.base.name())),
        }
    }

    /// Body schema of partial update
    #[must_use]
    pub fn partial_update(&self) -> Schema {
        match &self.partial_update {
            Some(schema) => schema.clone(),
            None => derive_schema(&self.update(), &BTreeSet::new(), true)
                .named(format!("{}PartialUpdate", self.base.name())),
        }
    }

    /// Query-parameter schema of an action
    #[must_use]
    pub fn params(&self, action: Action) -> &Schema {
        self.params.get(&action).unwrap_or(&self.default_params)
    }
}

/// Body schemas resolved once
#[derive(Debug, Clone)]
struct Resolved {
    create: Schema,
    update: Schema,
    partial_update: Schema,
}

/// View delegating every action to a [`Repository`]
///
/// ```rust,ignore
/// let items = GenericView::new(item_schema(), RepositorySource::shared(MemoryItems::default()))
///     .raises(Raises::new().catch_with::<DuplicateKey>(Raise::new().status(StatusCode::CONFLICT)));
/// let viewset = items.api(ViewConfig::new("Item"))?;
/// ```
pub struct GenericView<R> {
    repository: RepositorySource<R>,
    schemas: GenericSchemas,
    resolved: Resolved,
    raises: Raises,
}

impl<R: Repository> GenericView<R> {
    pub fn new(base: Schema, repository: RepositorySource<R>) -> Self {
        let schemas = GenericSchemas::new(base);
        let resolved = Resolved::from(&schemas);
        Self {
            repository,
            schemas,
            resolved,
            raises: Raises::default(),
        }
    }

    fn reschema(mut self, f: impl FnOnce(&mut GenericSchemas)) -> Self {
        f(&mut self.schemas);
        self.resolved = Resolved::from(&self.schemas);
        self
    }

    /// Primary-key schema (fields must appear in the detail route)
    #[must_use]
    pub fn with_pk(self, pk: Schema) -> Self {
        self.reschema(|s| s.pk = pk)
    }

    #[must_use]
    pub fn with_create_schema(self, schema: Schema) -> Self {
        self.reschema(|s| s.create = Some(schema))
    }

    #[must_use]
    pub fn with_update_schema(self, schema: Schema) -> Self {
        self.reschema(|s| s.update = Some(schema))
    }

    #[must_use]
    pub fn with_partial_update_schema(self, schema: Schema) -> Self {
        self.reschema(|s| s.partial_update = Some(schema))
    }

    /// Query parameters accepted by every action
    #[must_use]
    pub fn with_params(self, schema: Schema) -> Self {
        self.reschema(|s| s.default_params = schema)
    }

    /// Query parameters of one action
    #[must_use]
    pub fn with_action_params(self, action: Action, schema: Schema) -> Self {
        self.reschema(|s| {
            s.params.insert(action, schema);
        })
    }

    /// Repository errors converted into structured responses
    #[must_use]
    pub fn raises(mut self, raises: Raises) -> Self {
        self.raises = raises;
        self
    }

    #[must_use]
    pub fn schemas(&self) -> &GenericSchemas {
        &self.schemas
    }

    /// Viewset builder providing `actions`
    ///
    /// The response schema defaults to the base schema.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRoute`] when a detail action is requested and a primary-key field
    /// is missing from the detail route.
    pub fn viewset_builder(
        self,
        mut config: ViewConfig,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<ViewsetBuilder> {
        let actions: BTreeSet<Action> = actions.into_iter().collect();
        if actions.iter().any(Action::is_detail) {
            let params = path_params(&config.detail_route);
            if let Some(missing) = self
                .schemas
                .pk
                .fields()
                .iter()
                .map(|field| self.schemas.pk.alias_of(field))
                .find(|alias| !params.contains(alias))
            {
                return Err(Error::InvalidRoute {
                    path: config.detail_route,
                    reason: format!("primary key field `{missing}` is not a path parameter"),
                });
            }
        }
        if config.response_schema.is_none() {
            config.response_schema = Some(self.schemas.base.clone());
        }

        let view = Arc::new(self);
        Ok(actions.into_iter().fold(Viewset::builder(config), |builder, action| {
            let view = Arc::clone(&view);
            match action {
                Action::List => builder.list(view),
                Action::Create => builder.create(view),
                Action::Retrieve => builder.retrieve(view),
                Action::Update => builder.update(view),
                Action::PartialUpdate => builder.partial_update(view),
                Action::Destroy => builder.destroy(view),
            }
        }))
    }

    /// Viewset with every action
    ///
    /// # Errors
    ///
    /// See [`viewset_builder`](Self::viewset_builder).
    pub fn api(self, config: ViewConfig) -> Result<Viewset> {
        self.viewset_builder(config, Action::ALL)?.build()
    }

    fn params(&self, action: Action, query: &HashMap<String, String>) -> std::result::Result<Record, ApiError> {
        let schema = self.schemas.params(action);
        schema
            .validate_params(query)
            .map(|validated| validated.dump(schema, &kwargs_dump()))
            .map_err(|errors| invalid(errors, "query"))
    }

    /// Primary key merged with the query parameters
    fn kwargs(
        &self,
        action: Action,
        pk: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> std::result::Result<Record, ApiError> {
        let schema = &self.schemas.pk;
        let mut kwargs = schema
            .validate_params(pk)
            .map(|validated| validated.dump(schema, &kwargs_dump()))
            .map_err(|errors| invalid(errors, "path"))?;
        kwargs.extend(self.params(action, query)?);
        Ok(kwargs)
    }

    fn entity(schema: &Schema, body: &Value, only_set: bool) -> std::result::Result<Record, ApiError> {
        let validated = schema
            .validate(body, InputMode::Mapping)
            .map_err(|errors| invalid(errors, "body"))?;
        let options = DumpOptions {
            exclude_unset: only_set,
            ..DumpOptions::default()
        };
        Ok(validated.dump(schema, &options))
    }
}

impl From<&GenericSchemas> for Resolved {
    fn from(schemas: &GenericSchemas) -> Self {
        Self {
            create: schemas.create(),
            update: schemas.update(),
            partial_update: schemas.partial_update(),
        }
    }
}

fn kwargs_dump() -> DumpOptions {
    DumpOptions {
        exclude_none: true,
        ..DumpOptions::default()
    }
}

fn invalid(errors: Vec<FieldViolation>, source: &str) -> ApiError {
    ApiError::validation(errors.into_iter().map(|v| v.prefixed(source)).collect())
}

impl<R> fmt::Debug for GenericView<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericView")
            .field("repository", &self.repository)
            .field("schemas", &self.schemas)
            .field("raises", &self.raises)
            .finish()
    }
}

impl<R: Repository> ListAction for GenericView<R> {
    type Query = HashMap<String, String>;
    type Output = Vec<R::Entity>;

    async fn list(
        &self,
        _ctx: &mut ViewContext,
        query: HashMap<String, String>,
    ) -> anyhow::Result<Vec<R::Entity>> {
        let params = self.params(Action::List, &query)?;
        let repository = self.repository.get();
        repository.list(params).await.map_err(|e| self.raises.convert(e))
    }
}

impl<R: Repository> CreateAction for GenericView<R> {
    type Body = Value;
    type Query = HashMap<String, String>;
    type Output = Option<R::Entity>;

    async fn create(
        &self,
        _ctx: &mut ViewContext,
        body: Value,
        query: HashMap<String, String>,
    ) -> anyhow::Result<Option<R::Entity>> {
        let entity = Self::entity(&self.resolved.create, &body, false)?;
        let params = self.params(Action::Create, &query)?;
        let repository = self.repository.get();
        repository
            .create(entity, params)
            .await
            .map_err(|e| self.raises.convert(e))
    }
}

impl<R: Repository> RetrieveAction for GenericView<R> {
    type Id = HashMap<String, String>;
    type Query = HashMap<String, String>;
    type Output = R::Entity;

    async fn retrieve(
        &self,
        _ctx: &mut ViewContext,
        id: HashMap<String, String>,
        query: HashMap<String, String>,
    ) -> anyhow::Result<Option<R::Entity>> {
        let kwargs = self.kwargs(Action::Retrieve, &id, &query)?;
        let repository = self.repository.get();
        repository.retrieve(kwargs).await.map_err(|e| self.raises.convert(e))
    }
}

impl<R: Repository> UpdateAction for GenericView<R> {
    type Id = HashMap<String, String>;
    type Body = Value;
    type Query = HashMap<String, String>;
    type Output = R::Entity;

    async fn update(
        &self,
        _ctx: &mut ViewContext,
        id: HashMap<String, String>,
        body: Value,
        query: HashMap<String, String>,
    ) -> anyhow::Result<Option<R::Entity>> {
        let kwargs = self.kwargs(Action::Update, &id, &query)?;
        let entity = Self::entity(&self.resolved.update, &body, false)?;
        let repository = self.repository.get();
        repository
            .update(entity, kwargs)
            .await
            .map_err(|e| self.raises.convert(e))
    }
}

impl<R: Repository> PartialUpdateAction for GenericView<R> {
    type Id = HashMap<String, String>;
    type Body = Value;
    type Query = HashMap<String, String>;
    type Output = R::Entity;

    async fn partial_update(
        &self,
        _ctx: &mut ViewContext,
        id: HashMap<String, String>,
        body: Value,
        query: HashMap<String, String>,
    ) -> anyhow::Result<Option<R::Entity>> {
        let kwargs = self.kwargs(Action::PartialUpdate, &id, &query)?;
        let entity = Self::entity(&self.resolved.partial_update, &body, true)?;
        let repository = self.repository.get();
        repository
            .partial_update(entity, kwargs)
            .await
            .map_err(|e| self.raises.convert(e))
    }
}

impl<R: Repository> DestroyAction for GenericView<R> {
    type Id = HashMap<String, String>;
    type Query = HashMap<String, String>;

    async fn destroy(
        &self,
        _ctx: &mut ViewContext,
        id: HashMap<String, String>,
        query: HashMap<String, String>,
    ) -> anyhow::Result<()> {
        let kwargs = self.kwargs(Action::Destroy, &id, &query)?;
        let repository = self.repository.get();
        repository.delete(kwargs).await.map_err(|e| self.raises.convert(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn item() -> Schema {
        Schema::new("Item")
            .field(Field::new("id", FieldType::Uuid))
            .field(Field::new("name", FieldType::String))
            .field(Field::new("price", FieldType::Integer))
    }

    #[test]
    fn test_create_schema_generates_uuid() {
        let schemas = GenericSchemas::new(item());
        let create = schemas.create();
        assert_eq!(create.name(), "ItemCreate");
        let id = create.get("id").unwrap();
        assert!(!id.required);

        let validated = create
            .validate(&serde_json::json!({"name": "Widget", "price": 500}), InputMode::Mapping)
            .unwrap();
        let generated = validated.values()["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[test]
    fn test_update_schema_excludes_pk() {
        let schemas = GenericSchemas::new(item());
        assert_eq!(
            schemas.update().field_names().collect::<Vec<_>>(),
            ["name", "price"]
        );
        assert!(schemas.partial_update().fields().iter().all(|f| !f.required));
    }

    #[test]
    fn test_explicit_schemas_win() {
        let mut schemas = GenericSchemas::new(item());
        schemas.update = Some(Schema::new("Rename").field(Field::new("name", FieldType::String)));
        assert_eq!(schemas.update().name(), "Rename");
        assert_eq!(
            schemas.partial_update().field_names().collect::<Vec<_>>(),
            ["name"]
        );
    }

    #[test]
    fn test_params_default_to_shared_schema() {
        let mut schemas = GenericSchemas::new(item());
        schemas
            .params
            .insert(Action::List, Schema::new("ListParams").field(Field::new("q", FieldType::String)));
        assert_eq!(schemas.params(Action::List).name(), "ListParams");
        assert_eq!(schemas.params(Action::Retrieve).name(), "Params");
    }
}
