//! Response serialization through a schema
//!
//! A [`Serializer`] wraps one response schema (or "list of" it) behind a single
//! `serialize(value) -> bytes` call. With validation on, the value is checked against the
//! schema first. JSON maps (`serde_json::Value`, [`Record`] and vectors of them) are read
//! as mapping-like input, where a key may be a wire alias or a declared name. Any other
//! `Serialize` type is read as an attribute-bearing object, keyed by declared names.

use std::any::Any;
use std::collections::BTreeSet;

use axum::body::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::problem::{ApiError, FieldViolation};
use crate::schema::{DumpOptions, FieldNaming, InputMode, Record, Schema};

/// Per-view serialization options
#[derive(Debug, Clone)]
pub struct SerializerOptions {
    /// Validate against the schema before emitting
    pub validate: bool,
    /// Emit wire aliases
    pub by_alias: bool,
    /// Force a naming policy for wire keys
    pub field_naming: FieldNaming,
    /// Input detection
    pub input: InputMode,
    /// Fields never emitted
    pub exclude: BTreeSet<String>,
    /// Drop `null` fields
    pub exclude_none: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            validate: true,
            by_alias: true,
            field_naming: FieldNaming::AsDeclared,
            input: InputMode::Auto,
            exclude: BTreeSet::new(),
            exclude_none: true,
        }
    }
}

impl SerializerOptions {
    /// Emit camelCase keys
    #[must_use]
    pub fn camel_case(mut self) -> Self {
        self.field_naming = FieldNaming::CamelCase;
        self.by_alias = true;
        self
    }

    /// Never emit `fields`
    #[must_use]
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Emit the value as is
    #[must_use]
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

/// Input mode for a concrete value when detection is automatic
pub fn detect_input_mode(value: &dyn Any) -> InputMode {
    if value.is::<Value>()
        || value.is::<Record>()
        || value.is::<Vec<Value>>()
        || value.is::<Vec<Record>>()
        || value.is::<Option<Value>>()
        || value.is::<Option<Record>>()
    {
        InputMode::Mapping
    } else {
        InputMode::Attributes
    }
}

/// Serializer for one response schema
#[derive(Debug, Clone)]
pub struct Serializer {
    schema: Schema,
    camel: Schema,
    many: bool,
}

impl Serializer {
    /// Serializer for single objects
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        let camel = schema.clone().camel_case();
        Self {
            schema,
            camel,
            many: false,
        }
    }

    /// Serializer for arrays of objects
    #[must_use]
    pub fn many(schema: Schema) -> Self {
        Self {
            many: true,
            ..Self::new(schema)
        }
    }

    /// The wrapped schema
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Whether this serializer emits arrays
    #[must_use]
    pub fn is_many(&self) -> bool {
        self.many
    }

    fn effective_schema(&self, options: &SerializerOptions) -> &Schema {
        match options.field_naming {
            FieldNaming::CamelCase => &self.camel,
            FieldNaming::AsDeclared => &self.schema,
        }
    }

    /// Value to emit, before encoding
    ///
    /// # Errors
    ///
    /// Validation failures become a 422 carrying the field violations.
    pub fn to_value<T>(&self, value: &T, options: &SerializerOptions) -> Result<Value, ApiError>
    where
        T: Serialize + Any,
    {
        let mode = match options.input {
            InputMode::Auto => detect_input_mode(value),
            mode => mode,
        };
        let raw = serde_json::to_value(value).map_err(|e| {
            tracing::error!(error = %e, schema = self.schema.name(), "response is not serializable");
            ApiError::internal("Response could not be serialized")
        })?;

        if !options.validate || raw.is_null() {
            return Ok(raw);
        }

        let schema = self.effective_schema(options);
        let dump = DumpOptions {
            by_alias: options.by_alias,
            exclude_none: options.exclude_none,
            exclude_unset: false,
            exclude: options.exclude.clone(),
        };

        if self.many {
            let Value::Array(items) = raw else {
                return Err(response_invalid(vec![FieldViolation::new(
                    Vec::<String>::new(),
                    "Input should be a valid list",
                    "list_type",
                )]));
            };
            let mut out = Vec::with_capacity(items.len());
            let mut violations = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match schema.validate(item, mode) {
                    Ok(validated) => out.push(Value::Object(validated.dump(schema, &dump))),
                    Err(errors) => violations.extend(
                        errors.into_iter().map(|v| v.prefixed(index.to_string())),
                    ),
                }
            }
            if violations.is_empty() {
                Ok(Value::Array(out))
            } else {
                Err(response_invalid(violations))
            }
        } else {
            schema
                .validate(&raw, mode)
                .map(|validated| Value::Object(validated.dump(schema, &dump)))
                .map_err(response_invalid)
        }
    }

    /// Canonical JSON bytes
    ///
    /// # Errors
    ///
    /// See [`to_value`](Self::to_value).
    pub fn serialize<T>(&self, value: &T, options: &SerializerOptions) -> Result<Bytes, ApiError>
    where
        T: Serialize + Any,
    {
        let value = self.to_value(value, options)?;
        serde_json::to_vec(&value)
            .map(Bytes::from)
            .map_err(|e| ApiError::internal(format!("Response could not be encoded: {e}")))
    }
}

fn response_invalid(errors: Vec<FieldViolation>) -> ApiError {
    tracing::warn!(violations = errors.len(), "response failed schema validation");
    ApiError::unprocessable_entity("Response validation failed")
        .with_errors(errors.into_iter().map(|v| v.prefixed("response")).collect())
}
