//! OpenAPI schema objects to plain JSON Schema, as advertised by gateways.

use std::collections::HashSet;

use serde_json::{Map as JsonMap, Value as JsonValue, json};

/// OpenAPI-only keywords with no JSON Schema meaning.
const OPENAPI_ONLY: &[&str] = &[
    "nullable",
    "example",
    "examples",
    "xml",
    "externalDocs",
    "discriminator",
    "readOnly",
    "writeOnly",
    "deprecated",
    "$schema",
];

/// Convert `schema`, inlining references found in `components`. Unions are
/// collapsed to their first branch; a reference cycle or an unresolvable
/// reference becomes an untyped object.
pub fn to_json_schema(schema: &JsonValue, components: Option<&JsonMap<String, JsonValue>>) -> JsonValue {
    convert(schema, components, &mut HashSet::new())
}

fn convert(
    schema: &JsonValue,
    components: Option<&JsonMap<String, JsonValue>>,
    visiting: &mut HashSet<String>,
) -> JsonValue {
    let Some(node) = schema.as_object() else {
        return schema.clone();
    };
    if let Some(reference) = node.get("$ref").and_then(JsonValue::as_str) {
        let segment = reference.rsplit('/').next().unwrap_or(reference).to_string();
        let target = components.and_then(|c| c.get(&segment));
        return match target {
            Some(target) if !visiting.contains(&segment) => {
                visiting.insert(segment.clone());
                let out = convert(target, components, visiting);
                visiting.remove(&segment);
                out
            }
            _ => json!({"type": "object"}),
        };
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(first) = node.get(key).and_then(JsonValue::as_array).and_then(|b| b.first()) {
            let mut out = convert(first, components, visiting);
            if let (Some(description), Some(obj)) = (node.get("description"), out.as_object_mut()) {
                obj.entry("description").or_insert_with(|| description.clone());
            }
            return out;
        }
    }

    let mut out = JsonMap::new();
    for (key, value) in node {
        if OPENAPI_ONLY.contains(&key.as_str()) {
            continue;
        }
        let converted = match key.as_str() {
            "properties" => match value.as_object() {
                Some(props) => JsonValue::Object(
                    props
                        .iter()
                        .map(|(k, v)| (k.clone(), convert(v, components, visiting)))
                        .collect(),
                ),
                None => value.clone(),
            },
            "items" | "additionalProperties" | "not" => convert(value, components, visiting),
            "allOf" => match value.as_array() {
                Some(parts) => JsonValue::Array(
                    parts.iter().map(|p| convert(p, components, visiting)).collect(),
                ),
                None => value.clone(),
            },
            _ => value.clone(),
        };
        out.insert(key.clone(), converted);
    }
    JsonValue::Object(out)
}

/// Add the required `contentType` property that tells callers which media
/// type the body is encoded as.
pub fn with_content_type(schema: JsonValue, media_type: &str) -> JsonValue {
    let mut obj = match schema {
        JsonValue::Object(obj) => obj,
        other => {
            let mut wrapped = JsonMap::new();
            wrapped.insert("type".into(), JsonValue::from("object"));
            wrapped.insert("properties".into(), json!({"value": other}));
            wrapped
        }
    };
    let properties = obj
        .entry("properties")
        .or_insert_with(|| JsonValue::Object(JsonMap::new()));
    if let Some(props) = properties.as_object_mut() {
        props.insert(
            "contentType".into(),
            json!({"description": format!("MUST BE SET TO {media_type}"), "type": "string"}),
        );
    }
    let required = obj
        .entry("required")
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if let Some(list) = required.as_array_mut() {
        list.push(JsonValue::from("contentType"));
    }
    JsonValue::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_openapi_keywords_and_collapses_unions() {
        let schema = json!({
            "type": "object",
            "nullable": true,
            "example": {"a": 1},
            "properties": {
                "kind": {"oneOf": [{"type": "string"}, {"type": "integer"}], "description": "Kind"},
                "tags": {"type": "array", "items": {"type": "string", "deprecated": true}}
            }
        });
        let out = to_json_schema(&schema, None);
        assert_eq!(
            out,
            json!({
                "type": "object",
                "properties": {
                    "kind": {"type": "string", "description": "Kind"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            })
        );
    }

    #[test]
    fn references_are_inlined_without_looping() {
        let doc = json!({"schemas": {
            "Node": {"type": "object", "properties": {"next": {"$ref": "#/components/schemas/Node"}}}
        }});
        let components = doc["schemas"].as_object();
        let out = to_json_schema(&json!({"$ref": "#/components/schemas/Node"}), components);
        assert_eq!(
            out,
            json!({"type": "object", "properties": {"next": {"type": "object"}}})
        );
    }

    #[test]
    fn content_type_is_required() {
        let out = with_content_type(json!({"type": "object"}), "application/json");
        assert_eq!(
            out,
            json!({
                "type": "object",
                "properties": {"contentType": {"description": "MUST BE SET TO application/json", "type": "string"}},
                "required": ["contentType"]
            })
        );
    }
}
