// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use serde_json::Value;

/// Scalar kinds a tool argument may take. Deliberately closed (no
/// `Value`/`Any` variant) so validation never falls back to "whatever
/// JSON happened to show up" — every field's shape is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Number,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Number => value.is_number(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Number => "number",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub description: String,
}

impl Field {
    pub fn required(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// A tool's typed argument schema, replacing a free-form JSON-schema
/// blob: every field's name, scalar type, and required-ness is declared
/// up front, and [`ArgSchema::validate`] is the sole place a tool call's
/// arguments are checked against it.
#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    pub fields: Vec<Field>,
}

impl ArgSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }
}

/// Arguments that have passed schema validation: a plain map a handler
/// can index into without re-checking presence or type.
#[derive(Debug, Clone)]
pub struct ValidArgs(pub HashMap<String, Value>);

impl ValidArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    MissingRequired { field: String },
    WrongType { field: String, expected: &'static str },
    UnknownTool { name: String },
}

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgError::MissingRequired { field } => write!(f, "missing required field `{field}`"),
            ArgError::WrongType { field, expected } => {
                write!(f, "field `{field}` must be of type {expected}")
            }
            ArgError::UnknownTool { name } => write!(f, "unknown tool `{name}`"),
        }
    }
}

impl std::error::Error for ArgError {}

/// A tagged two-variant result, kept distinct from `Result` per the
/// design notes' framing of argument validation as producing a tagged
/// variant rather than relying on exceptions or dynamic typing.
#[derive(Debug, Clone)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn into_result(self) -> Result<L, R> {
        match self {
            Either::Left(l) => Ok(l),
            Either::Right(r) => Err(r),
        }
    }
}

/// Validates `args` against `schema`: every required field is present
/// with a matching scalar type; unknown extra keys are passed through
/// unchecked (tools may accept optional free-form extras).
pub fn validate(schema: &ArgSchema, args: &Value) -> Either<ValidArgs, ArgError> {
    let object = match args.as_object() {
        Some(object) => object,
        None => {
            return Either::Right(ArgError::WrongType {
                field: "<root>".to_string(),
                expected: "object",
            })
        }
    };

    for field in &schema.fields {
        match object.get(&field.name) {
            Some(value) if field.kind.matches(value) => {}
            Some(_) => {
                return Either::Right(ArgError::WrongType {
                    field: field.name.clone(),
                    expected: field.kind.name(),
                })
            }
            None if field.required => {
                return Either::Right(ArgError::MissingRequired {
                    field: field.name.clone(),
                })
            }
            None => {}
        }
    }

    let map = object.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    Either::Left(ValidArgs(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> ArgSchema {
        ArgSchema::new(vec![
            Field::required("path", FieldKind::String, "file path"),
            Field::optional("depth", FieldKind::Integer, "recursion depth"),
        ])
    }

    #[test]
    fn validates_required_and_optional_present() {
        let args = json!({ "path": "/tmp", "depth": 2 });
        let result = validate(&sample_schema(), &args).into_result().unwrap();
        assert_eq!(result.str("path"), Some("/tmp"));
        assert_eq!(result.i64("depth"), Some(2));
    }

    #[test]
    fn missing_required_field_is_error() {
        let args = json!({ "depth": 2 });
        let err = validate(&sample_schema(), &args).into_result().unwrap_err();
        assert_eq!(err, ArgError::MissingRequired { field: "path".into() });
    }

    #[test]
    fn wrong_type_is_error() {
        let args = json!({ "path": 5 });
        let err = validate(&sample_schema(), &args).into_result().unwrap_err();
        assert_eq!(
            err,
            ArgError::WrongType {
                field: "path".into(),
                expected: "string"
            }
        );
    }

    #[test]
    fn missing_optional_field_is_fine() {
        let args = json!({ "path": "/tmp" });
        let result = validate(&sample_schema(), &args).into_result().unwrap();
        assert_eq!(result.get("depth"), None);
    }

    #[test]
    fn non_object_args_is_error() {
        let args = json!("not an object");
        let err = validate(&sample_schema(), &args).into_result().unwrap_err();
        assert!(matches!(err, ArgError::WrongType { .. }));
    }
}
