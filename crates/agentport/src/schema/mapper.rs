//! Schema nodes to type declarations.
//!
//! Nested declarations are registered before the declaration that uses them,
//! so the registry order is a valid definition order for generated code.

use std::collections::HashSet;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, warn};

use super::registry::TypeRegistry;
use crate::model::{
    Field, MediaSchema, ParameterSpec, SynthesizedType, TypeRef, clean_class_name,
    clean_variable_name,
};

const PARAMETERS_DESCRIPTION: &str = "Parameters (ie. for a GET method) for this API Call";
const REQUEST_BODY_DESCRIPTION: &str = "Request body (ie. for a POST method) for this API Call";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Top of a declaration: untyped or property-less objects still become records.
    Root,
    /// Inside a field: property-less objects are plain maps.
    Field,
}

pub struct SchemaTypeMapper<'a> {
    registry: &'a mut TypeRegistry,
    components: Option<&'a JsonMap<String, JsonValue>>,
    in_progress: HashSet<String>,
}

impl<'a> SchemaTypeMapper<'a> {
    pub fn new(registry: &'a mut TypeRegistry) -> Self {
        Self {
            registry,
            components: None,
            in_progress: HashSet::new(),
        }
    }

    /// Resolve `$ref`s against `components.schemas` of `document`.
    pub fn with_components(mut self, document: &'a JsonValue) -> Self {
        self.components = document
            .pointer("/components/schemas")
            .and_then(JsonValue::as_object);
        self
    }

    /// Map a schema that names a declaration of its own.
    pub fn map_root(&mut self, schema: &JsonValue, name: &str) -> TypeRef {
        self.map_node(schema, name, Position::Root, None)
    }

    /// Map a property schema; property-less objects become maps.
    pub fn type_hint(&mut self, schema: &JsonValue, name: &str) -> TypeRef {
        self.map_node(schema, name, Position::Field, None)
    }

    /// One record holding every parameter, or `None` when there are none.
    pub fn map_parameters(&mut self, params: &[ParameterSpec], name: &str) -> Option<TypeRef> {
        if params.is_empty() {
            return None;
        }
        let class = clean_class_name(name);
        if self.registry.contains(&class) {
            debug!("parameter type '{}' already registered", class);
            return Some(TypeRef::Named(class));
        }
        let mut fields = Vec::with_capacity(params.len());
        for param in params {
            let nested = format!("{name}_{}", param.name);
            let ty = match (&param.schema, param.content.first()) {
                (Some(schema), _) => self.type_hint(schema, &nested),
                (None, Some(media)) => self.type_hint(&media.schema, &nested),
                (None, None) => TypeRef::Str,
            };
            fields.push(Field::new(
                &param.name,
                ty,
                param.required,
                Some(param.description.clone()),
            ));
        }
        self.registry
            .register(SynthesizedType::record(class.clone(), None, fields));
        Some(TypeRef::Named(class))
    }

    /// Map each media type of a request body to a record named
    /// `{tool}_{media}`. Several records are joined under a
    /// `{tool}_Request_Body` union alias; a single record is used directly.
    ///
    /// Bodies whose root is not a record cannot be typed and are skipped.
    pub fn map_content(&mut self, content: &[MediaSchema], tool_name: &str) -> Option<TypeRef> {
        let mut models: Vec<TypeRef> = Vec::new();
        for media in content {
            let name = format!("{tool_name}_{}", clean_variable_name(&media.media_type));
            let ty = self.map_node(&media.schema, &name, Position::Root, Some(&media.media_type));
            match ty {
                TypeRef::Named(_) => {
                    if !models.contains(&ty) {
                        models.push(ty);
                    }
                }
                other => warn!(
                    "request body '{}' of {} is not an object ({:?}); leaving it untyped",
                    media.media_type, tool_name, other
                ),
            }
        }
        match models.len() {
            0 => None,
            1 => models.pop(),
            _ => {
                let alias = clean_class_name(&format!("{tool_name}_Request_Body"));
                self.registry
                    .register(SynthesizedType::union(alias.clone(), models));
                Some(TypeRef::Named(alias))
            }
        }
    }

    /// Wrap parameters and body into one `{tool}_Input` record when both exist.
    pub fn compose(
        &mut self,
        tool_name: &str,
        params: Option<(TypeRef, bool)>,
        body: Option<(TypeRef, bool)>,
    ) -> Option<TypeRef> {
        match (params, body) {
            (Some((params, params_required)), Some((body, body_required))) => {
                let class = clean_class_name(&format!("{tool_name}_Input"));
                let fields = vec![
                    Field::new(
                        "parameters",
                        params,
                        params_required,
                        Some(PARAMETERS_DESCRIPTION.to_string()),
                    ),
                    Field::new(
                        "request_body",
                        body,
                        body_required,
                        Some(REQUEST_BODY_DESCRIPTION.to_string()),
                    ),
                ];
                self.registry
                    .register(SynthesizedType::record(class.clone(), None, fields));
                Some(TypeRef::Named(class))
            }
            (Some((params, _)), None) => Some(params),
            (None, Some((body, _))) => Some(body),
            (None, None) => None,
        }
    }

    fn map_node(
        &mut self,
        schema: &JsonValue,
        name: &str,
        position: Position,
        annotation: Option<&str>,
    ) -> TypeRef {
        let Some(node) = schema.as_object() else {
            warn!("schema for '{}' is not an object; using Any", name);
            return TypeRef::Any;
        };
        if let Some(reference) = node.get("$ref").and_then(JsonValue::as_str) {
            return self.map_reference(reference);
        }
        for key in ["anyOf", "oneOf"] {
            if let Some(branches) = node.get(key).and_then(JsonValue::as_array) {
                return self.map_union(branches, name);
            }
        }
        if let Some(parts) = node.get("allOf").and_then(JsonValue::as_array) {
            let merged = self.merge_all_of(node, parts);
            return self.map_node(&merged, name, position, annotation);
        }

        let has_properties = node.contains_key("properties");
        match type_tag(node) {
            Some("object") | None if has_properties || position == Position::Root => {
                self.map_object(node, name, annotation)
            }
            Some("array") => {
                let item = match node.get("items") {
                    Some(items) => self.type_hint(items, &format!("{name}_item")),
                    None => TypeRef::Any,
                };
                TypeRef::List(Box::new(item))
            }
            Some(tag) => TypeRef::from_tag(tag),
            None => TypeRef::Any,
        }
    }

    fn map_object(
        &mut self,
        node: &JsonMap<String, JsonValue>,
        name: &str,
        annotation: Option<&str>,
    ) -> TypeRef {
        let class = clean_class_name(name);
        if self.registry.contains(&class) {
            debug!("type '{}' already registered; reusing it", class);
            return TypeRef::Named(class);
        }
        let required: HashSet<&str> = node
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|r| r.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        if let Some(media_type) = annotation {
            fields.push(Field::new(
                "content_type_annotation",
                TypeRef::Literal(media_type.to_string()),
                true,
                None,
            ));
        }
        if let Some(properties) = node.get("properties").and_then(JsonValue::as_object) {
            for (property, schema) in properties {
                let ty = self.type_hint(schema, &format!("{name}_{property}"));
                fields.push(Field::new(
                    property,
                    ty,
                    required.contains(property.as_str()),
                    description_of(schema),
                ));
            }
        }
        let description = node
            .get("description")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        self.registry
            .register(SynthesizedType::record(class.clone(), description, fields));
        TypeRef::Named(class)
    }

    fn map_reference(&mut self, reference: &str) -> TypeRef {
        let segment = reference.rsplit('/').next().unwrap_or(reference);
        let class = clean_class_name(segment);
        if self.registry.contains(&class) {
            return TypeRef::Named(class);
        }
        if self.in_progress.contains(&class) {
            warn!("self-referencing schema '{}'; using Any", reference);
            return TypeRef::Any;
        }
        let Some(target) = self.components.and_then(|c| c.get(segment)) else {
            warn!("unresolved schema reference '{}'; using Any", reference);
            return TypeRef::Any;
        };
        self.in_progress.insert(class.clone());
        let ty = self.map_node(target, segment, Position::Root, None);
        self.in_progress.remove(&class);
        ty
    }

    fn map_union(&mut self, branches: &[JsonValue], name: &str) -> TypeRef {
        let mut variants: Vec<TypeRef> = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            let ty = self.type_hint(branch, &format!("{name}_option{}", i + 1));
            if !variants.contains(&ty) {
                variants.push(ty);
            }
        }
        match variants.len() {
            0 => TypeRef::Any,
            1 => variants.remove(0),
            _ => TypeRef::Union(variants),
        }
    }

    /// Flatten `allOf` object branches into one object schema.
    fn merge_all_of(&self, node: &JsonMap<String, JsonValue>, parts: &[JsonValue]) -> JsonValue {
        let mut properties = JsonMap::new();
        let mut required: Vec<JsonValue> = Vec::new();
        for part in parts {
            let resolved = match part.get("$ref").and_then(JsonValue::as_str) {
                Some(reference) => {
                    let segment = reference.rsplit('/').next().unwrap_or(reference);
                    self.components.and_then(|c| c.get(segment)).unwrap_or(part)
                }
                None => part,
            };
            if let Some(props) = resolved.get("properties").and_then(JsonValue::as_object) {
                for (k, v) in props {
                    properties.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
            if let Some(req) = resolved.get("required").and_then(JsonValue::as_array) {
                for r in req {
                    if !required.contains(r) {
                        required.push(r.clone());
                    }
                }
            }
        }
        let mut merged = JsonMap::new();
        merged.insert("type".into(), JsonValue::from("object"));
        if let Some(description) = node.get("description") {
            merged.insert("description".into(), description.clone());
        }
        merged.insert("properties".into(), JsonValue::Object(properties));
        merged.insert("required".into(), JsonValue::Array(required));
        JsonValue::Object(merged)
    }
}

/// Type tag of a node; for tag lists the first non-null entry wins.
fn type_tag(node: &JsonMap<String, JsonValue>) -> Option<&str> {
    match node.get("type")? {
        JsonValue::String(tag) => Some(tag.as_str()),
        JsonValue::Array(tags) => tags
            .iter()
            .filter_map(JsonValue::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn description_of(schema: &JsonValue) -> Option<String> {
    schema
        .get("description")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}
