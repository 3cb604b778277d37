use serde_json::{Map as JsonMap, Value as JsonValue, json};
use tracing::debug;

use super::openapi::operations;
use super::{Operation, Tool, ToolBody, ToolGroup, ToolInput, function_region};
use crate::model::{
    ActionGroup, ActionSchema, FunctionSpec, OperationSpec, TOOL_NAME_BUDGET, clean_variable_name,
    dedupe_names, gateway_namespaces, namespaced_budget, prune_tool_name,
};
use crate::schema::json_schema::{to_json_schema, with_content_type};
use crate::schema::{SchemaTypeMapper, TypeRegistry};

const NO_DESCRIPTION: &str = "No Description Provided.";

enum Source<'g> {
    OpenApi {
        document: &'g JsonValue,
        op: OperationSpec,
    },
    Function(&'g FunctionSpec),
}

struct Candidate<'g> {
    slot: usize,
    group: &'g ActionGroup,
    namespace: String,
    raw_name: String,
    source: Source<'g>,
}

/// Builds one tool per operation of every custom action group of an agent.
///
/// Types for locally emitted tools land in the agent's registry. Tools of
/// groups served through the gateway only carry their advertised schema.
pub struct ToolSynthesizer<'r> {
    registry: &'r mut TypeRegistry,
    gateway: bool,
}

impl<'r> ToolSynthesizer<'r> {
    pub fn new(registry: &'r mut TypeRegistry, gateway: bool) -> Self {
        Self { registry, gateway }
    }

    pub fn synthesize<'g>(&mut self, groups: impl IntoIterator<Item = &'g ActionGroup>) -> Vec<ToolGroup> {
        let order: Vec<&'g ActionGroup> = groups.into_iter().collect();
        let namespaces = gateway_namespaces(order.iter().map(|g| g.name.as_str()));
        let mut candidates: Vec<Candidate<'g>> = Vec::new();
        for (slot, (group, namespace)) in order.iter().copied().zip(&namespaces).enumerate() {
            let clean_group = clean_variable_name(&group.name);
            match &group.schema {
                Some(ActionSchema::OpenApi { document }) => {
                    for op in operations(document) {
                        candidates.push(Candidate {
                            slot,
                            group,
                            namespace: namespace.clone(),
                            raw_name: format!(
                                "{clean_group}_{}_{}",
                                clean_variable_name(&op.path),
                                op.method
                            ),
                            source: Source::OpenApi { document, op },
                        });
                    }
                }
                Some(ActionSchema::Functions { functions }) => {
                    for function in functions {
                        candidates.push(Candidate {
                            slot,
                            group,
                            namespace: namespace.clone(),
                            raw_name: format!("{clean_group}_{}", clean_variable_name(&function.name)),
                            source: Source::Function(function),
                        });
                    }
                }
                None => debug!("action group '{}' has no schema", group.name),
            }
        }

        let mut names: Vec<String> = candidates.iter().map(|c| c.raw_name.clone()).collect();
        dedupe_names(&mut names);

        let mut groups: Vec<ToolGroup> = order
            .iter()
            .zip(namespaces)
            .map(|(g, namespace)| ToolGroup {
                action_group: g.name.clone(),
                namespace,
                function_ref: g.function_ref().map(str::to_string),
                tools: Vec::new(),
            })
            .collect();
        for (candidate, name) in candidates.iter().zip(names) {
            let proxied = self.gateway && candidate.group.function_ref().is_some();
            let budget = if proxied {
                namespaced_budget(&candidate.namespace)
            } else {
                TOOL_NAME_BUDGET
            };
            let name = prune_tool_name(&name, budget);
            let tool = self.build(candidate, name, proxied);
            groups[candidate.slot].tools.push(tool);
        }
        groups
    }

    fn build(&mut self, candidate: &Candidate<'_>, name: String, proxied: bool) -> Tool {
        let group = candidate.group;
        let body = match group.function_ref() {
            Some(function_ref) => ToolBody::Invoke {
                function_ref: function_ref.to_string(),
                region: function_region(function_ref),
            },
            None => ToolBody::InteractiveStub,
        };
        match &candidate.source {
            Source::OpenApi { document, op } => {
                let input = if proxied {
                    ToolInput::None
                } else {
                    self.openapi_input(document, op, &name)
                };
                Tool {
                    description: describe(op.description.as_deref(), group),
                    action_group: group.name.clone(),
                    input,
                    body,
                    operation: Operation::OpenApi {
                        path: op.path.clone(),
                        method: op.method.to_uppercase(),
                        has_parameters: !op.parameters.is_empty(),
                        default_media_type: op.request_body.first().map(|m| m.media_type.clone()),
                    },
                    input_schema: openapi_input_schema(op, document),
                    name,
                }
            }
            Source::Function(function) => {
                let input = if proxied {
                    ToolInput::None
                } else {
                    SchemaTypeMapper::new(&mut *self.registry)
                        .map_parameters(&function.parameters, &format!("{name}_Input"))
                        .map_or(ToolInput::None, ToolInput::Typed)
                };
                let description =
                    describe(Some(function.description.as_str()).filter(|d| !d.is_empty()), group);
                Tool {
                    description,
                    action_group: group.name.clone(),
                    input,
                    body,
                    operation: Operation::Function {
                        name: function.name.clone(),
                        parameter_types: function
                            .parameters
                            .iter()
                            .map(|p| (p.name.clone(), p.type_tag().to_string()))
                            .collect(),
                    },
                    input_schema: function_input_schema(function),
                    name,
                }
            }
        }
    }

    fn openapi_input(&mut self, document: &JsonValue, op: &OperationSpec, name: &str) -> ToolInput {
        let mut mapper = SchemaTypeMapper::new(&mut *self.registry).with_components(document);
        let params = mapper.map_parameters(&op.parameters, &format!("{name}_Params"));
        let body = mapper.map_content(&op.request_body, name);
        if !op.request_body.is_empty() && body.is_none() {
            return ToolInput::Untyped;
        }
        let params_required = op.parameters.iter().any(|p| p.required);
        match mapper.compose(
            name,
            params.map(|p| (p, params_required)),
            body.map(|b| (b, op.request_body_required)),
        ) {
            Some(ty) => ToolInput::Typed(ty),
            None => ToolInput::None,
        }
    }
}

/// Operation description followed by a back-reference to the owning group.
pub fn describe(description: Option<&str>, group: &ActionGroup) -> String {
    let base = description.unwrap_or(NO_DESCRIPTION);
    if group.description.is_empty() {
        format!(
            "{base}\nThis tool is part of the group of tools called {}.",
            group.name
        )
    } else {
        format!(
            "{base}\nThis tool is part of the group of tools called {} (description: {}).",
            group.name, group.description
        )
    }
}

fn openapi_input_schema(op: &OperationSpec, document: &JsonValue) -> JsonValue {
    let components = document
        .pointer("/components/schemas")
        .and_then(JsonValue::as_object);
    let mut properties = JsonMap::new();
    let mut required: Vec<JsonValue> = Vec::new();
    if !op.parameters.is_empty() {
        let mut param_properties = JsonMap::new();
        let mut required_params: Vec<JsonValue> = Vec::new();
        for param in &op.parameters {
            let schema = match (&param.schema, param.content.first()) {
                (Some(schema), _) => {
                    let mut converted = to_json_schema(schema, components);
                    if !param.description.is_empty()
                        && let Some(obj) = converted.as_object_mut()
                    {
                        obj.insert("description".into(), JsonValue::from(param.description.clone()));
                    }
                    converted
                }
                (None, Some(media)) => {
                    with_content_type(to_json_schema(&media.schema, components), &media.media_type)
                }
                (None, None) => json!({"type": "string"}),
            };
            param_properties.insert(param.name.clone(), schema);
            if param.required {
                required_params.push(JsonValue::from(param.name.clone()));
            }
        }
        properties.insert(
            "parameters".into(),
            json!({"type": "object", "properties": param_properties, "required": required_params}),
        );
        required.push(JsonValue::from("parameters"));
    }
    if let Some(media) = op.request_body.first() {
        properties.insert(
            "requestBody".into(),
            with_content_type(to_json_schema(&media.schema, components), &media.media_type),
        );
        if op.request_body_required {
            required.push(JsonValue::from("requestBody"));
        }
    }
    json!({"type": "object", "properties": properties, "required": required})
}

fn function_input_schema(function: &FunctionSpec) -> JsonValue {
    let mut properties = JsonMap::new();
    let mut required: Vec<JsonValue> = Vec::new();
    for param in &function.parameters {
        properties.insert(
            param.name.clone(),
            json!({"type": param.type_tag(), "description": param.description}),
        );
        if param.required {
            required.push(JsonValue::from(param.name.clone()));
        }
    }
    json!({"type": "object", "properties": properties, "required": required})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{gateway_targets, routing_table};
    use crate::model::{Executor, TypeRef};
    use std::collections::HashSet;

    fn weather_group(backed: bool) -> ActionGroup {
        let document = json!({
            "paths": {"/weather": {"get": {
                "description": "Get the weather",
                "parameters": [{"name": "city", "in": "query", "required": true, "schema": {"type": "string"}}]
            }}}
        });
        ActionGroup {
            name: "WeatherAction".into(),
            description: "Weather tools".into(),
            enabled: true,
            executor: if backed {
                Executor::Function {
                    function_ref: "arn:aws:lambda:eu-west-1:123456789012:function:weather".into(),
                }
            } else {
                Executor::ReturnControl
            },
            schema: Some(ActionSchema::OpenApi { document }),
            builtin: None,
        }
    }

    #[test]
    fn weather_tool_without_gateway() {
        let group = weather_group(true);
        let mut registry = TypeRegistry::new();
        let groups = ToolSynthesizer::new(&mut registry, false).synthesize([&group]);
        assert_eq!(groups.len(), 1);
        let tool = &groups[0].tools[0];
        assert_eq!(tool.name, "weatheraction_weather_get");
        assert_eq!(
            tool.input,
            ToolInput::Typed(TypeRef::Named("WeatheractionWeatherGetParams".into()))
        );
        assert_eq!(
            tool.body,
            ToolBody::Invoke {
                function_ref: "arn:aws:lambda:eu-west-1:123456789012:function:weather".into(),
                region: "eu-west-1".into()
            }
        );
        assert_eq!(
            tool.description,
            "Get the weather\nThis tool is part of the group of tools called WeatherAction (description: Weather tools)."
        );
        assert_eq!(registry.len(), 1);
        let field = &registry.types()[0].fields()[0];
        assert_eq!((field.name.as_str(), &field.ty, field.required), ("city", &TypeRef::Str, true));
        assert!(!groups[0].is_proxied(false));
    }

    #[test]
    fn proxied_tools_skip_local_types() {
        let group = weather_group(true);
        let mut registry = TypeRegistry::new();
        let groups = ToolSynthesizer::new(&mut registry, true).synthesize([&group]);
        let tool = &groups[0].tools[0];
        assert_eq!(tool.name, "weatheraction_weather_get");
        assert_eq!(tool.input, ToolInput::None);
        assert!(registry.is_empty());
        assert!(groups[0].is_proxied(true));
        assert_eq!(
            tool.input_schema,
            json!({
                "type": "object",
                "properties": {"parameters": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"]
                }},
                "required": ["parameters"]
            })
        );
    }

    #[test]
    fn interactive_groups_get_stub_bodies() {
        let group = weather_group(false);
        let mut registry = TypeRegistry::new();
        let groups = ToolSynthesizer::new(&mut registry, true).synthesize([&group]);
        assert_eq!(groups[0].tools[0].body, ToolBody::InteractiveStub);
        assert!(!groups[0].is_proxied(true));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn function_groups_and_duplicate_names() {
        let group: ActionGroup = serde_json::from_value(json!({
            "name": "Orders",
            "schema": {"kind": "functions", "functions": [
                {"name": "lookup", "parameters": {"id": {"type": "integer", "required": true}}},
                {"name": "lookup!"},
                {"name": "cancel"}
            ]}
        }))
        .expect("group");
        let mut registry = TypeRegistry::new();
        let groups = ToolSynthesizer::new(&mut registry, false).synthesize([&group]);
        let names: Vec<_> = groups[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders_lookup", "orders_lookup_2", "orders_cancel"]);
        assert_eq!(
            groups[0].tools[0].description,
            "No Description Provided.\nThis tool is part of the group of tools called Orders."
        );
        assert_eq!(groups[0].tools[1].input, ToolInput::None);
        assert_eq!(registry.types()[0].name, "OrdersLookupInput");
        assert_eq!(
            groups[0].tools[0].input_schema["required"],
            json!(["id"])
        );
    }

    #[test]
    fn suffixed_names_never_shadow_existing_ones() {
        let group: ActionGroup = serde_json::from_value(json!({
            "name": "Orders",
            "executor": {"kind": "function", "function_ref": "arn:aws:lambda:us-east-1:123456789012:function:orders"},
            "schema": {"kind": "functions", "functions": [
                {"name": "lookup"},
                {"name": "lookup"},
                {"name": "lookup_2"}
            ]}
        }))
        .expect("group");
        let mut registry = TypeRegistry::new();
        let groups = ToolSynthesizer::new(&mut registry, true).synthesize([&group]);
        let names: Vec<_> = groups[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders_lookup", "orders_lookup_3", "orders_lookup_2"]);

        let keys: HashSet<String> = routing_table(&groups).into_iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn groups_cleaning_alike_get_distinct_namespaces() {
        let backed = |name: &str| -> ActionGroup {
            serde_json::from_value(json!({
                "name": name,
                "executor": {"kind": "function", "function_ref": "arn:aws:lambda:us-east-1:123456789012:function:orders"},
                "schema": {"kind": "functions", "functions": [{"name": "lookup"}]}
            }))
            .expect("group")
        };
        let first = backed("Orders");
        let second = backed("orders!");
        let mut registry = TypeRegistry::new();
        let groups = ToolSynthesizer::new(&mut registry, true).synthesize([&first, &second]);
        let targets: Vec<_> = gateway_targets(&groups).into_iter().map(|t| t.name).collect();
        assert_eq!(targets, vec!["orders", "orders_2"]);
        let keys: HashSet<String> = routing_table(&groups).into_iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn long_names_are_pruned_deterministically() {
        let path = format!("/{}", "segment/".repeat(12));
        let group: ActionGroup = serde_json::from_value(json!({
            "name": "Inventory",
            "schema": {"kind": "open_api", "document": {"paths": {path: {"get": {}, "post": {}}}}}
        }))
        .expect("group");
        let mut registry = TypeRegistry::new();
        let first = ToolSynthesizer::new(&mut registry, false).synthesize([&group]);
        let mut registry = TypeRegistry::new();
        let second = ToolSynthesizer::new(&mut registry, false).synthesize([&group]);
        let a = &first[0].tools[0].name;
        let b = &first[0].tools[1].name;
        assert!(a.len() <= 57 && b.len() <= 57);
        assert_ne!(a, b);
        assert_eq!(a, &second[0].tools[0].name);
    }
}
