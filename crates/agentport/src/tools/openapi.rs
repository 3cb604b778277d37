//! Operation extraction from OpenAPI path maps.

use serde_json::{Map as JsonMap, Value as JsonValue, json};
use tracing::warn;

use crate::model::{MediaSchema, OperationSpec, ParameterLocation, ParameterSpec};

const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Every `path × method` pair of `document`, in document order.
///
/// Path-level parameters are inherited by each operation unless the
/// operation redeclares the same name and location.
pub fn operations(document: &JsonValue) -> Vec<OperationSpec> {
    let Some(paths) = document.get("paths").and_then(JsonValue::as_object) else {
        warn!("OpenAPI document has no paths");
        return Vec::new();
    };
    let mut out = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        let shared = parameters_of(item, document);
        for (method, op) in item {
            if !METHODS.contains(&method.as_str()) {
                continue;
            }
            let Some(op) = op.as_object() else {
                continue;
            };
            let mut parameters = parameters_of(op, document);
            for inherited in &shared {
                let redeclared = parameters
                    .iter()
                    .any(|p| p.name == inherited.name && p.location == inherited.location);
                if !redeclared {
                    parameters.push(inherited.clone());
                }
            }
            let (request_body, request_body_required) = request_body_of(op, document);
            out.push(OperationSpec {
                path: path.clone(),
                method: method.clone(),
                description: text(op, "description").or_else(|| text(op, "summary")),
                parameters,
                request_body,
                request_body_required,
            });
        }
    }
    out
}

fn text(node: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
    node.get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Follow a local `#/...` reference inside `document`.
fn resolve<'d>(node: &'d JsonValue, document: &'d JsonValue) -> &'d JsonValue {
    match node.get("$ref").and_then(JsonValue::as_str) {
        Some(reference) => match reference.strip_prefix('#') {
            Some(pointer) => document.pointer(pointer).unwrap_or(node),
            None => node,
        },
        None => node,
    }
}

fn parameters_of(node: &JsonMap<String, JsonValue>, document: &JsonValue) -> Vec<ParameterSpec> {
    let Some(list) = node.get("parameters").and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|raw| {
            let param = resolve(raw, document).as_object()?;
            let name = param.get("name").and_then(JsonValue::as_str)?;
            if name.is_empty() {
                return None;
            }
            let location = param
                .get("in")
                .and_then(JsonValue::as_str)
                .map(ParameterLocation::from_openapi)
                .unwrap_or_default();
            let declared = param
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            let schema = match param.get("schema") {
                Some(schema) => Some(schema.clone()),
                None if !param.contains_key("content") => {
                    let tag = param.get("type").and_then(JsonValue::as_str).unwrap_or("string");
                    Some(json!({ "type": tag }))
                }
                None => None,
            };
            Some(ParameterSpec {
                name: name.to_string(),
                description: text(param, "description").unwrap_or_default(),
                required: declared || location == ParameterLocation::Path,
                location,
                schema,
                content: media_of(param.get("content")),
            })
        })
        .collect()
}

fn request_body_of(
    op: &JsonMap<String, JsonValue>,
    document: &JsonValue,
) -> (Vec<MediaSchema>, bool) {
    let Some(body) = op.get("requestBody") else {
        return (Vec::new(), false);
    };
    let body = resolve(body, document);
    let required = body
        .get("required")
        .and_then(JsonValue::as_bool)
        .unwrap_or(false);
    (media_of(body.get("content")), required)
}

fn media_of(content: Option<&JsonValue>) -> Vec<MediaSchema> {
    content
        .and_then(JsonValue::as_object)
        .map(|content| {
            content
                .iter()
                .map(|(media_type, entry)| MediaSchema {
                    media_type: media_type.clone(),
                    schema: entry.get("schema").cloned().unwrap_or_else(|| json!({})),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_operations_in_document_order() {
        let doc = json!({
            "paths": {
                "/weather": {
                    "get": {
                        "summary": "Current weather",
                        "parameters": [
                            {"name": "city", "in": "query", "required": true, "schema": {"type": "string"}}
                        ]
                    },
                    "post": {
                        "description": "Report weather",
                        "requestBody": {
                            "required": true,
                            "content": {"application/json": {"schema": {"type": "object"}}}
                        }
                    },
                    "summary": "not an operation"
                }
            }
        });
        let ops = operations(&doc);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].method, "get");
        assert_eq!(ops[0].description.as_deref(), Some("Current weather"));
        assert_eq!(ops[0].parameters[0].type_tag(), "string");
        assert!(ops[0].parameters[0].required);
        assert_eq!(ops[1].request_body.len(), 1);
        assert!(ops[1].request_body_required);
        assert_eq!(ops[1].description.as_deref(), Some("Report weather"));
    }

    #[test]
    fn resolves_parameter_references_and_inherits_path_parameters() {
        let doc = json!({
            "components": {"parameters": {
                "Limit": {"name": "limit", "in": "query", "schema": {"type": "integer"}}
            }},
            "paths": {
                "/users/{id}": {
                    "parameters": [{"name": "id", "in": "path", "schema": {"type": "string"}}],
                    "get": {"parameters": [{"$ref": "#/components/parameters/Limit"}]}
                }
            }
        });
        let ops = operations(&doc);
        let params = &ops[0].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "limit");
        assert_eq!(params[0].type_tag(), "integer");
        assert_eq!(params[1].location, ParameterLocation::Path);
        assert!(params[1].required);
    }

    #[test]
    fn documents_without_paths_yield_nothing() {
        assert!(operations(&json!({"openapi": "3.0.0"})).is_empty());
    }
}
