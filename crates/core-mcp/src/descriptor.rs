// SPDX-License-Identifier: Apache-2.0
use serde_json::Value;

use core_tools::{ArgSchema, Field, FieldKind};

/// Converts a `tools/list` entry's `inputSchema` (§6.2, a JSON-schema-like
/// object: `{ type: "object", properties: {name: {type, description}},
/// required: [...] }`) into the typed [`ArgSchema`] the dispatcher
/// validates against. Unsupported property types default to `String`
/// rather than rejecting the whole tool, since a permissive string field
/// still lets the call through for the handler itself to interpret.
pub fn json_schema_to_arg_schema(schema: &Value) -> ArgSchema {
    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = properties else {
        return ArgSchema::empty();
    };

    let fields = properties
        .iter()
        .map(|(name, spec)| {
            let kind = match spec.get("type").and_then(Value::as_str) {
                Some("integer") => FieldKind::Integer,
                Some("boolean") => FieldKind::Boolean,
                Some("number") => FieldKind::Number,
                _ => FieldKind::String,
            };
            let description = spec
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if required.contains(&name.as_str()) {
                Field::required(name.clone(), kind, description)
            } else {
                Field::optional(name.clone(), kind, description)
            }
        })
        .collect();

    ArgSchema::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_required_and_optional_fields() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "file path" },
                "depth": { "type": "integer" }
            },
            "required": ["path"]
        });
        let arg_schema = json_schema_to_arg_schema(&schema);
        let path_field = arg_schema.fields.iter().find(|f| f.name == "path").unwrap();
        let depth_field = arg_schema.fields.iter().find(|f| f.name == "depth").unwrap();
        assert!(path_field.required);
        assert!(!depth_field.required);
        assert_eq!(depth_field.kind, FieldKind::Integer);
    }

    #[test]
    fn missing_properties_yields_empty_schema() {
        let schema = json!({ "type": "object" });
        let arg_schema = json_schema_to_arg_schema(&schema);
        assert!(arg_schema.fields.is_empty());
    }
}
