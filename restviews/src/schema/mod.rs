//! Declarative data-shape descriptions
//!
//! A [`Schema`] is a plain value: an ordered list of [`Field`]s. Request bodies, path and
//! query parameters and responses are validated against schemas at request time, and
//! per-action variants are produced with [`derive_schema`] instead of new types.
//!
//! ```rust
//! use restviews::schema::{derive_schema, Field, FieldType, Schema};
//! use std::collections::BTreeSet;
//!
//! let item = Schema::new("Item")
//!     .field(Field::new("id", FieldType::Uuid))
//!     .field(Field::new("name", FieldType::String))
//!     .field(Field::new("price", FieldType::Integer));
//!
//! let exclude = BTreeSet::from(["id".to_string()]);
//! let patch = derive_schema(&item, &exclude, true);
//! assert!(patch.fields().iter().all(|f| !f.required));
//! assert!(patch.get("id").is_none());
//! ```

use std::collections::BTreeSet;
use std::fmt;

use heck::ToLowerCamelCase;
use serde_json::Value;

mod validate;

pub use validate::{DumpOptions, InputMode, Validated};

/// Mapping-like record: what the generic layer hands to repositories
pub type Record = serde_json::Map<String, Value>;

/// Value type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// JSON string
    String,
    /// Whole number
    Integer,
    /// Any JSON number
    Number,
    /// `true` / `false`
    Boolean,
    /// UUID in string form
    Uuid,
    /// RFC 3339 timestamp
    DateTime,
    /// `YYYY-MM-DD`
    Date,
    /// Any JSON value
    Any,
    /// Homogeneous array
    List(Box<FieldType>),
    /// Nested object
    Object(Box<Schema>),
}

impl FieldType {
    /// Array of `inner`
    #[must_use]
    pub fn list(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Nested object described by `schema`
    #[must_use]
    pub fn object(schema: Schema) -> Self {
        Self::Object(Box::new(schema))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Uuid => f.write_str("uuid"),
            Self::DateTime => f.write_str("datetime"),
            Self::Date => f.write_str("date"),
            Self::Any => f.write_str("any"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Object(schema) => f.write_str(schema.name()),
        }
    }
}

/// Default used when a field is absent from the input
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// Fixed value
    Value(Value),
    /// Computed for each validation (e.g. a fresh UUID)
    Factory(fn() -> Value),
}

impl FieldDefault {
    /// Produce the default value
    #[must_use]
    pub fn produce(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Declared name
    pub name: String,
    /// Explicit wire alias
    pub alias: Option<String>,
    /// Value type
    pub ty: FieldType,
    /// Must be present in the input (unless it has a default)
    pub required: bool,
    /// Accepts `null`
    pub nullable: bool,
    /// Value used when absent
    pub default: Option<FieldDefault>,
    /// Human description
    pub description: Option<String>,
}

impl Field {
    /// Required, non-nullable field
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            ty,
            required: true,
            nullable: false,
            default: None,
            description: None,
        }
    }

    /// Optional field that may also be `null`
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }

    /// Accept `null`
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Fixed default
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(FieldDefault::Value(value));
        self
    }

    /// Computed default
    #[must_use]
    pub fn with_default_factory(mut self, factory: fn() -> Value) -> Self {
        self.required = false;
        self.default = Some(FieldDefault::Factory(factory));
        self
    }

    /// Explicit wire alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How field names map to wire keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldNaming {
    /// Wire key is the declared name
    #[default]
    AsDeclared,
    /// Wire key is the lowerCamelCase form of the declared name
    CamelCase,
}

/// Ordered collection of fields
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    naming: FieldNaming,
}

impl Schema {
    /// Empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            naming: FieldNaming::AsDeclared,
        }
    }

    /// Append a field, replacing any field with the same name
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.retain(|existing| existing.name != field.name);
        self.fields.push(field);
        self
    }

    /// Append every field of `other` (fields of `other` win on name clashes)
    #[must_use]
    pub fn extend(self, other: &Schema) -> Self {
        other.fields.iter().cloned().fold(self, Schema::field)
    }

    /// Rename
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use camelCase wire keys
    #[must_use]
    pub fn camel_case(mut self) -> Self {
        self.naming = FieldNaming::CamelCase;
        self
    }

    /// Schema name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by declared name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Declared field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Naming policy
    #[must_use]
    pub fn naming(&self) -> FieldNaming {
        self.naming
    }

    /// Wire key for a field
    #[must_use]
    pub fn alias_of(&self, field: &Field) -> String {
        match (&field.alias, self.naming) {
            (Some(alias), _) => alias.clone(),
            (None, FieldNaming::CamelCase) => field.name.to_lower_camel_case(),
            (None, FieldNaming::AsDeclared) => field.name.clone(),
        }
    }
}

/// New schema from `base` without the `exclude`d fields
///
/// With `make_optional` every remaining field becomes optional with no default, so a
/// value that was not sent stays unset instead of being filled in.
#[must_use]
pub fn derive_schema(base: &Schema, exclude: &BTreeSet<String>, make_optional: bool) -> Schema {
    let fields = base
        .fields
        .iter()
        .filter(|field| !exclude.contains(&field.name))
        .cloned()
        .map(|mut field| {
            if make_optional {
                field.required = false;
                field.default = None;
            }
            field
        })
        .collect();

    let suffix = if make_optional { "Partial" } else { "Derived" };
    Schema {
        name: format!("{}{suffix}", base.name),
        fields,
        naming: base.naming,
    }
}

/// `{id: uuid}`
#[must_use]
pub fn id_schema() -> Schema {
    Schema::new("IdSchema").field(Field::new("id", FieldType::Uuid))
}

/// `{created_at, updated_at}` timestamps
#[must_use]
pub fn created_updated_schema() -> Schema {
    Schema::new("CreatedUpdatedSchema")
        .field(Field::new("created_at", FieldType::DateTime))
        .field(Field::new("updated_at", FieldType::DateTime))
}

/// A fresh v4 UUID as a JSON string
#[must_use]
pub fn new_uuid() -> Value {
    Value::String(uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Schema {
        Schema::new("Item")
            .field(Field::new("id", FieldType::Uuid))
            .field(Field::new("name", FieldType::String))
            .field(Field::new("unit_price", FieldType::Integer).with_default(Value::from(0)))
    }

    #[test]
    fn test_derive_excludes_fields() {
        let exclude = BTreeSet::from(["id".to_string()]);
        let derived = derive_schema(&item(), &exclude, false);
        assert_eq!(derived.field_names().collect::<Vec<_>>(), ["name", "unit_price"]);
        assert!(derived.get("name").is_some_and(|f| f.required));
        assert_eq!(derived.name(), "ItemDerived");
    }

    #[test]
    fn test_derive_make_optional_drops_defaults() {
        let derived = derive_schema(&item(), &BTreeSet::new(), true);
        assert!(derived.fields().iter().all(|f| !f.required && f.default.is_none()));
        // the base is untouched
        assert!(item().get("unit_price").is_some_and(|f| f.default.is_some()));
    }

    #[test]
    fn test_field_replaces_same_name() {
        let schema = item().field(Field::new("name", FieldType::Any));
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.get("name").map(|f| &f.ty), Some(&FieldType::Any));
    }

    #[test]
    fn test_camel_case_alias() {
        let schema = item().camel_case();
        let field = schema.get("unit_price").unwrap();
        assert_eq!(schema.alias_of(field), "unitPrice");
        assert_eq!(item().alias_of(field), "unit_price");
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::list(FieldType::Uuid).to_string(), "list[uuid]");
        assert_eq!(FieldType::object(id_schema()).to_string(), "IdSchema");
    }
}
