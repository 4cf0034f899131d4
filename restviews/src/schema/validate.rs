//! Validation, parameter coercion and dumping

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use super::{Field, FieldType, Record, Schema};
use crate::problem::FieldViolation;

/// How keys of an input object are matched to fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Pick [`Mapping`](Self::Mapping) for JSON maps and [`Attributes`](Self::Attributes)
    /// for everything else
    #[default]
    Auto,
    /// Mapping-like record: a key may be the wire alias or the declared name
    Mapping,
    /// Attribute-bearing object: keys are declared names
    Attributes,
}

/// Options for turning a validated value back into a record
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Emit wire aliases instead of declared names
    pub by_alias: bool,
    /// Drop `null` values
    pub exclude_none: bool,
    /// Drop fields that were neither sent nor defaulted
    pub exclude_unset: bool,
    /// Drop these top-level fields
    pub exclude: BTreeSet<String>,
}

/// Input that passed validation
///
/// `values` is keyed by declared name. `fields_set` holds the fields that were present in
/// the input, as opposed to filled in from defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    values: Record,
    fields_set: BTreeSet<String>,
}

impl Validated {
    /// Values keyed by declared name
    #[must_use]
    pub fn values(&self) -> &Record {
        &self.values
    }

    /// Consume into the values
    #[must_use]
    pub fn into_values(self) -> Record {
        self.values
    }

    /// Fields present in the input
    #[must_use]
    pub fn fields_set(&self) -> &BTreeSet<String> {
        &self.fields_set
    }

    /// Whether a field was present in the input
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.fields_set.contains(name)
    }

    /// Record for handing on, shaped by `options`
    #[must_use]
    pub fn dump(&self, schema: &Schema, options: &DumpOptions) -> Record {
        let mut out = Record::new();
        for field in schema.fields() {
            if options.exclude.contains(&field.name) {
                continue;
            }
            if options.exclude_unset && !self.is_set(&field.name) {
                continue;
            }
            let Some(value) = self.values.get(&field.name) else {
                continue;
            };
            if options.exclude_none && value.is_null() {
                continue;
            }
            let key = if options.by_alias {
                schema.alias_of(field)
            } else {
                field.name.clone()
            };
            out.insert(key, dump_value(&field.ty, value, options));
        }
        out
    }
}

fn dump_value(ty: &FieldType, value: &Value, options: &DumpOptions) -> Value {
    match (ty, value) {
        (FieldType::List(inner), Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| dump_value(inner, item, options))
                .collect(),
        ),
        (FieldType::Object(schema), Value::Object(map)) => {
            let nested = Validated {
                fields_set: map.keys().cloned().collect(),
                values: map.clone(),
            };
            let nested_options = DumpOptions {
                exclude: BTreeSet::new(),
                exclude_unset: false,
                ..options.clone()
            };
            Value::Object(nested.dump(schema, &nested_options))
        }
        _ => value.clone(),
    }
}

impl Schema {
    /// Validate a JSON value against the schema
    ///
    /// Unknown keys are ignored. Every violation is collected rather than stopping at the
    /// first one.
    pub fn validate(&self, input: &Value, mode: InputMode) -> Result<Validated, Vec<FieldViolation>> {
        let Value::Object(map) = input else {
            return Err(vec![FieldViolation::new(
                Vec::<String>::new(),
                format!("Input should be a valid object for {}", self.name()),
                "model_type",
            )]);
        };
        let mode = match mode {
            InputMode::Auto => InputMode::Mapping,
            other => other,
        };

        let mut values = Record::new();
        let mut fields_set = BTreeSet::new();
        let mut violations = Vec::new();

        for field in self.fields() {
            let raw = lookup(self, field, map, mode);
            match raw {
                Some(raw) => match check_field(field, raw) {
                    Ok(value) => {
                        values.insert(field.name.clone(), value);
                        fields_set.insert(field.name.clone());
                    }
                    Err(errors) => violations.extend(
                        errors
                            .into_iter()
                            .map(|v| v.prefixed(self.alias_of(field))),
                    ),
                },
                None => {
                    if let Some(default) = &field.default {
                        values.insert(field.name.clone(), default.produce());
                    } else if field.required {
                        violations.push(FieldViolation::new(
                            [self.alias_of(field)],
                            "Field required",
                            "missing",
                        ));
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(Validated { values, fields_set })
        } else {
            Err(violations)
        }
    }

    /// Validate string parameters (path segments, query strings)
    ///
    /// Each raw string is first converted to the JSON type its field expects; strings that
    /// do not convert are left as strings and fail type validation.
    pub fn validate_params(
        &self,
        raw: &HashMap<String, String>,
    ) -> Result<Validated, Vec<FieldViolation>> {
        let mut input = Record::new();
        for field in self.fields() {
            let alias = self.alias_of(field);
            let value = raw.get(&alias).or_else(|| raw.get(&field.name));
            if let Some(value) = value {
                input.insert(alias, coerce_param(&field.ty, value));
            }
        }
        self.validate(&Value::Object(input), InputMode::Mapping)
    }
}

fn lookup<'a>(schema: &Schema, field: &Field, map: &'a Record, mode: InputMode) -> Option<&'a Value> {
    match mode {
        InputMode::Attributes => map.get(&field.name),
        InputMode::Mapping | InputMode::Auto => map
            .get(&schema.alias_of(field))
            .or_else(|| map.get(&field.name)),
    }
}

fn check_field(field: &Field, raw: &Value) -> Result<Value, Vec<FieldViolation>> {
    if raw.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err(vec![FieldViolation::new(
                Vec::<String>::new(),
                format!("Input should be a valid {}", field.ty),
                "none_not_allowed",
            )])
        };
    }
    check_type(&field.ty, raw)
}

fn type_error(ty: &FieldType, kind: &str) -> Vec<FieldViolation> {
    vec![FieldViolation::new(
        Vec::<String>::new(),
        format!("Input should be a valid {ty}"),
        kind,
    )]
}

fn check_type(ty: &FieldType, raw: &Value) -> Result<Value, Vec<FieldViolation>> {
    match ty {
        FieldType::Any => Ok(raw.clone()),
        FieldType::String => match raw {
            Value::String(_) => Ok(raw.clone()),
            _ => Err(type_error(ty, "string_type")),
        },
        FieldType::Integer => match raw {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
                _ => Err(type_error(ty, "int_from_float")),
            },
            _ => Err(type_error(ty, "int_type")),
        },
        FieldType::Number => match raw {
            Value::Number(_) => Ok(raw.clone()),
            _ => Err(type_error(ty, "float_type")),
        },
        FieldType::Boolean => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            _ => Err(type_error(ty, "bool_type")),
        },
        FieldType::Uuid => match raw.as_str().map(uuid::Uuid::parse_str) {
            Some(Ok(_)) => Ok(raw.clone()),
            Some(Err(_)) => Err(type_error(ty, "uuid_parsing")),
            None => Err(type_error(ty, "uuid_type")),
        },
        FieldType::DateTime => match raw.as_str().map(chrono::DateTime::parse_from_rfc3339) {
            Some(Ok(_)) => Ok(raw.clone()),
            Some(Err(_)) => Err(type_error(ty, "datetime_parsing")),
            None => Err(type_error(ty, "datetime_type")),
        },
        FieldType::Date => match raw
            .as_str()
            .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        {
            Some(Ok(_)) => Ok(raw.clone()),
            Some(Err(_)) => Err(type_error(ty, "date_parsing")),
            None => Err(type_error(ty, "date_type")),
        },
        FieldType::List(inner) => {
            let Value::Array(items) = raw else {
                return Err(type_error(ty, "list_type"));
            };
            let mut out = Vec::with_capacity(items.len());
            let mut violations = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match check_type(inner, item) {
                    Ok(value) => out.push(value),
                    Err(errors) => violations.extend(
                        errors.into_iter().map(|v| v.prefixed(index.to_string())),
                    ),
                }
            }
            if violations.is_empty() {
                Ok(Value::Array(out))
            } else {
                Err(violations)
            }
        }
        FieldType::Object(schema) => schema
            .validate(raw, InputMode::Mapping)
            .map(|validated| Value::Object(validated.into_values())),
    }
}

fn coerce_param(ty: &FieldType, raw: &str) -> Value {
    let fallback = || Value::String(raw.to_string());
    match ty {
        FieldType::Integer => raw.parse::<i64>().map(Value::from).unwrap_or_else(|_| fallback()),
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(fallback),
        FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => fallback(),
        },
        FieldType::List(inner) => Value::Array(
            raw.split(',')
                .filter(|part| !part.is_empty())
                .map(|part| coerce_param(inner, part.trim()))
                .collect(),
        ),
        FieldType::Any | FieldType::Object(_) => {
            serde_json::from_str(raw).unwrap_or_else(|_| fallback())
        }
        FieldType::String | FieldType::Uuid | FieldType::DateTime | FieldType::Date => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{id_schema, new_uuid, Field};
    use serde_json::json;

    fn item() -> Schema {
        Schema::new("Item")
            .field(Field::new("id", FieldType::Uuid).with_default_factory(new_uuid))
            .field(Field::new("name", FieldType::String))
            .field(Field::new("unit_price", FieldType::Integer))
            .field(Field::new("note", FieldType::String).optional())
    }

    #[test]
    fn test_valid_input_tracks_fields_set() {
        let validated = item()
            .validate(&json!({"name": "Widget", "unit_price": 500}), InputMode::Mapping)
            .unwrap();

        assert!(validated.is_set("name"));
        assert!(!validated.is_set("id"));
        assert!(validated.values()["id"].as_str().is_some());
        assert!(validated.values().get("note").is_none());
    }

    #[test]
    fn test_collects_every_violation() {
        let errors = item()
            .validate(&json!({"unit_price": "cheap", "id": "nope"}), InputMode::Mapping)
            .unwrap_err();

        let locs: Vec<_> = errors.iter().map(|e| e.loc.join(".")).collect();
        assert!(locs.contains(&"id".to_string()));
        assert!(locs.contains(&"name".to_string()));
        assert!(locs.contains(&"unit_price".to_string()));
        assert_eq!(errors.iter().find(|e| e.loc == ["name"]).unwrap().kind, "missing");
    }

    #[test]
    fn test_null_only_for_nullable() {
        let ok = item().validate(
            &json!({"name": "a", "unit_price": 1, "note": null}),
            InputMode::Mapping,
        );
        assert!(ok.is_ok());

        let err = item()
            .validate(&json!({"name": null, "unit_price": 1}), InputMode::Mapping)
            .unwrap_err();
        assert_eq!(err[0].kind, "none_not_allowed");
    }

    #[test]
    fn test_mapping_accepts_alias_attributes_do_not() {
        let schema = item().camel_case();
        let input = json!({"name": "a", "unitPrice": 3});

        assert!(schema.validate(&input, InputMode::Mapping).is_ok());
        let errors = schema.validate(&input, InputMode::Attributes).unwrap_err();
        assert_eq!(errors[0].loc, ["unitPrice"]);

        let by_name = json!({"name": "a", "unit_price": 3});
        assert!(schema.validate(&by_name, InputMode::Attributes).is_ok());
    }

    #[test]
    fn test_nested_list_locations() {
        let schema = Schema::new("Batch").field(Field::new("ids", FieldType::list(FieldType::Uuid)));
        let errors = schema
            .validate(&json!({"ids": [uuid::Uuid::nil().to_string(), "x"]}), InputMode::Mapping)
            .unwrap_err();
        assert_eq!(errors[0].loc, ["ids", "1"]);
    }

    #[test]
    fn test_params_are_coerced() {
        let schema = Schema::new("Params")
            .field(Field::new("limit", FieldType::Integer))
            .field(Field::new("active", FieldType::Boolean).optional());
        let raw = HashMap::from([
            ("limit".to_string(), "25".to_string()),
            ("active".to_string(), "yes".to_string()),
        ]);
        let validated = schema.validate_params(&raw).unwrap();
        assert_eq!(validated.values()["limit"], json!(25));
        assert_eq!(validated.values()["active"], json!(true));

        let bad = HashMap::from([("limit".to_string(), "many".to_string())]);
        assert_eq!(schema.validate_params(&bad).unwrap_err()[0].kind, "int_type");
    }

    #[test]
    fn test_pk_params_reject_bad_uuid() {
        let raw = HashMap::from([("id".to_string(), "not-a-uuid".to_string())]);
        let errors = id_schema().validate_params(&raw).unwrap_err();
        assert_eq!(errors[0].kind, "uuid_parsing");
    }

    #[test]
    fn test_dump_options() {
        let schema = item().camel_case();
        let validated = schema
            .validate(&json!({"name": "a", "unit_price": 2, "note": null}), InputMode::Mapping)
            .unwrap();

        let unset_dropped = validated.dump(
            &schema,
            &DumpOptions {
                exclude_unset: true,
                ..DumpOptions::default()
            },
        );
        assert!(unset_dropped.get("id").is_none());
        assert_eq!(unset_dropped["note"], Value::Null);

        let aliased = validated.dump(
            &schema,
            &DumpOptions {
                by_alias: true,
                exclude_none: true,
                exclude: BTreeSet::from(["id".to_string()]),
                ..DumpOptions::default()
            },
        );
        assert_eq!(aliased, json!({"name": "a", "unitPrice": 2}).as_object().unwrap().clone());
    }
}
