//! Per-view configuration

use crate::problem::ErrorKind;
use crate::schema::Schema;
use crate::serializer::SerializerOptions;

/// Static configuration of one view
///
/// # Example
///
/// ```rust
/// use restviews::prelude::*;
///
/// let config = ViewConfig::new("Item")
///     .with_response_schema(Schema::new("Item").field(Field::new("id", FieldType::Uuid)))
///     .throws(ErrorKind::Forbidden);
/// assert_eq!(config.detail_route, "/{id}");
/// ```
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Human name used in route names, operation ids and "does not exist" messages
    pub component_name: String,
    /// Suffix appended to the prefix for detail actions
    pub detail_route: String,
    /// Schema the action output is validated and emitted through
    pub response_schema: Option<Schema>,
    /// The list action returns an array of `response_schema`
    pub response_schema_as_list: bool,
    /// Turn an absent retrieve/update result into a 404
    pub raise_on_none: bool,
    /// Emit the created object (otherwise an empty 201)
    pub return_on_create: bool,
    /// Emit the updated object (otherwise an empty 200)
    pub return_on_update: bool,
    /// Extra error kinds every route of the view declares
    pub errors: Vec<ErrorKind>,
    /// Output serialization
    pub serializer: SerializerOptions,
}

impl ViewConfig {
    /// Defaults for a component
    pub fn new(component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            detail_route: "/{id}".to_string(),
            response_schema: None,
            response_schema_as_list: true,
            raise_on_none: true,
            return_on_create: true,
            return_on_update: true,
            errors: Vec::new(),
            serializer: SerializerOptions::default(),
        }
    }

    /// Validate and emit every action output through `schema`
    #[must_use]
    pub fn with_response_schema(mut self, schema: Schema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Detail suffix other than `/{id}`, such as `/{slug}`
    #[must_use]
    pub fn with_detail_route(mut self, route: impl Into<String>) -> Self {
        self.detail_route = route.into();
        self
    }

    /// List returns a single `response_schema` object instead of an array
    #[must_use]
    pub fn list_as_object(mut self) -> Self {
        self.response_schema_as_list = false;
        self
    }

    /// Emit `null` instead of a 404 when an action finds nothing
    #[must_use]
    pub fn allow_none(mut self) -> Self {
        self.raise_on_none = false;
        self
    }

    /// Answer create with an empty 201
    #[must_use]
    pub fn without_body_on_create(mut self) -> Self {
        self.return_on_create = false;
        self
    }

    /// Answer update and partial update with an empty 200
    #[must_use]
    pub fn without_body_on_update(mut self) -> Self {
        self.return_on_update = false;
        self
    }

    /// Declare an extra error kind on every route of the view
    #[must_use]
    pub fn throws(mut self, kind: ErrorKind) -> Self {
        if !self.errors.contains(&kind) {
            self.errors.push(kind);
        }
        self
    }

    /// Output options (`exclude`, `exclude_none`, `by_alias`)
    #[must_use]
    pub fn with_serializer_options(mut self, options: SerializerOptions) -> Self {
        self.serializer = options;
        self
    }

    /// `"{component_name} does not exist."`
    #[must_use]
    pub fn not_found_detail(&self) -> String {
        format!("{} does not exist.", self.component_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewConfig::new("Item");
        assert_eq!(config.detail_route, "/{id}");
        assert!(config.raise_on_none);
        assert!(config.return_on_create && config.return_on_update);
        assert!(config.response_schema_as_list);
    }

    #[test]
    fn test_throws_deduplicates() {
        let config = ViewConfig::new("Item")
            .throws(ErrorKind::Forbidden)
            .throws(ErrorKind::Forbidden);
        assert_eq!(config.errors, [ErrorKind::Forbidden]);
    }

    #[test]
    fn test_not_found_detail() {
        assert_eq!(ViewConfig::new("Item").not_found_detail(), "Item does not exist.");
    }
}
