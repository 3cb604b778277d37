//! Python source for synthesized tools.

use serde_json::{Map as JsonMap, Value as JsonValue, json};

use super::{Operation, Tool, ToolBody, ToolInput};
use crate::emit::format::fill;
use crate::emit::python::{literal, pretty_literal, string_literal, triple_quoted};
use crate::model::AgentDefinition;
use crate::schema::render::type_hint;

const HELPERS: &str = r#"AGENT_METADATA = {{metadata}}


def _dump_input(input_data):
    if input_data is None:
        return {}
    if isinstance(input_data, BaseModel):
        return input_data.model_dump(exclude_unset=True, by_alias=True)
    return dict(input_data)


def _action_payload(action_group):
    return {
        "messageVersion": "1.0",
        "agent": AGENT_METADATA,
        "sessionId": "",
        "sessionAttributes": {},
        "promptSessionAttributes": {},
        "actionGroup": action_group,
        "inputText": last_input,
    }


def _invoke_action_group(function_ref, region, payload):
    lambda_client = boto3.client("lambda", region_name=region)
    response = lambda_client.invoke(
        FunctionName=function_ref,
        InvocationType="RequestResponse",
        Payload=json.dumps(payload),
    )
    return json.loads(response["Payload"].read().decode("utf-8"))"#;

const OPENAPI_INVOKE: &str = r#"{{decorator}}
def {{name}}({{signature}}) -> str:
    {{docstring}}
    {{params_dump}}
    {{body_dump}}
    payload = _action_payload({{action_group}})
    payload.update({
        "apiPath": {{path}},
        "httpMethod": {{method}},
        "parameters": [{"name": name, "value": value} for name, value in params_dump.items()],
    })
    if body_dump:
        content_type = body_dump.pop("content_type_annotation", {{media_type}})
        payload["requestBody"] = {
            "content": {
                content_type: {
                    "properties": [{"name": name, "value": value} for name, value in body_dump.items()]
                }
            }
        }

    try:
        return str(_invoke_action_group({{function_ref}}, {{region}}, payload))
    except Exception as e:
        return f"Error executing {{name}}: {str(e)}""#;

const FUNCTION_INVOKE: &str = r#"{{decorator}}
def {{name}}({{signature}}) -> str:
    {{docstring}}
    model_dump = {{dump}}
    parameter_types = {{parameter_types}}
    payload = _action_payload({{action_group}})
    payload.update({
        "function": {{function}},
        "parameters": [
            {"name": name, "type": parameter_types.get(name, "string"), "value": value}
            for name, value in model_dump.items()
        ],
    })

    try:
        return str(_invoke_action_group({{function_ref}}, {{region}}, payload))
    except Exception as e:
        return f"Error executing {{name}}: {str(e)}""#;

const STUB: &str = r#"{{decorator}}
def {{name}}({{signature}}) -> str:
    {{docstring}}
    return input({{prompt}})"#;

/// Module-level helpers shared by every tool that invokes a backing function.
pub fn render_helpers(agent: &AgentDefinition) -> String {
    let metadata = json!({
        "name": agent.name,
        "id": agent.id,
        "alias": agent.alias,
        "version": agent.version,
    });
    fill(HELPERS, &[("metadata", &pretty_literal(&metadata))])
}

fn signature(input: &ToolInput) -> String {
    match input {
        ToolInput::None => String::new(),
        ToolInput::Typed(ty) => format!("input_data: {}", type_hint(ty)),
        ToolInput::Untyped => "input_data: Optional[Dict[str, Any]] = None".to_string(),
    }
}

/// Python function for `tool`, preceded by `decorator`.
pub fn render_tool(tool: &Tool, decorator: &str) -> String {
    let signature = signature(&tool.input);
    let docstring = triple_quoted(&tool.description);
    let dump = if tool.input == ToolInput::None {
        "{}"
    } else {
        "_dump_input(input_data)"
    };
    match (&tool.body, &tool.operation) {
        (ToolBody::InteractiveStub, _) => {
            let prompt = if tool.input == ToolInput::None {
                string_literal(&format!(
                    "Return of control: {} was called, enter desired output:",
                    tool.name
                ))
            } else {
                format!(
                    "f\"Return of control: {} was called with the input {{input_data}}, enter desired output:\"",
                    tool.name
                )
            };
            fill(
                STUB,
                &[
                    ("decorator", decorator),
                    ("name", &tool.name),
                    ("signature", &signature),
                    ("docstring", &docstring),
                    ("prompt", &prompt),
                ],
            )
        }
        (
            ToolBody::Invoke { function_ref, region },
            Operation::OpenApi { path, method, has_parameters, default_media_type },
        ) => {
            let has_body = default_media_type.is_some();
            let (params_dump, body_dump) = match (&tool.input, *has_parameters, has_body) {
                (ToolInput::None, _, _) => ("params_dump = {}".to_string(), "body_dump = {}".to_string()),
                (ToolInput::Typed(_), true, false) => (
                    format!("params_dump = {dump}"),
                    "body_dump = {}".to_string(),
                ),
                (_, false, _) => ("params_dump = {}".to_string(), format!("body_dump = {dump}")),
                _ => (
                    format!("model_dump = {dump}\n    params_dump = model_dump.get(\"parameters\") or {{}}"),
                    "body_dump = dict(model_dump.get(\"request_body\") or {})".to_string(),
                ),
            };
            let media_type = default_media_type.as_deref().unwrap_or("application/json");
            fill(
                OPENAPI_INVOKE,
                &[
                    ("decorator", decorator),
                    ("name", &tool.name),
                    ("signature", &signature),
                    ("docstring", &docstring),
                    ("params_dump", &params_dump),
                    ("body_dump", &body_dump),
                    ("action_group", &string_literal(&tool.action_group)),
                    ("path", &string_literal(path)),
                    ("method", &string_literal(method)),
                    ("media_type", &string_literal(media_type)),
                    ("function_ref", &string_literal(function_ref)),
                    ("region", &string_literal(region)),
                ],
            )
        }
        (
            ToolBody::Invoke { function_ref, region },
            Operation::Function { name, parameter_types },
        ) => {
            let types: JsonMap<String, JsonValue> = parameter_types
                .iter()
                .map(|(n, t)| (n.clone(), json!(t)))
                .collect();
            fill(
                FUNCTION_INVOKE,
                &[
                    ("decorator", decorator),
                    ("name", &tool.name),
                    ("signature", &signature),
                    ("docstring", &docstring),
                    ("dump", dump),
                    ("parameter_types", &literal(&JsonValue::Object(types))),
                    ("action_group", &string_literal(&tool.action_group)),
                    ("function", &string_literal(name)),
                    ("function_ref", &string_literal(function_ref)),
                    ("region", &string_literal(region)),
                ],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeRef;

    fn openapi_tool(input: ToolInput, has_parameters: bool, media: Option<&str>) -> Tool {
        Tool {
            name: "weatheraction_weather_get".into(),
            description: "Get the weather".into(),
            action_group: "WeatherAction".into(),
            input,
            body: ToolBody::Invoke {
                function_ref: "arn:aws:lambda:eu-west-1:1:function:w".into(),
                region: "eu-west-1".into(),
            },
            operation: Operation::OpenApi {
                path: "/weather".into(),
                method: "GET".into(),
                has_parameters,
                default_media_type: media.map(str::to_string),
            },
            input_schema: json!({}),
        }
    }

    #[test]
    fn backed_openapi_tool_invokes_function() {
        let tool = openapi_tool(
            ToolInput::Typed(TypeRef::Named("WeatheractionWeatherGetParams".into())),
            true,
            None,
        );
        let code = render_tool(&tool, "@tool");
        assert!(code.starts_with("@tool\ndef weatheraction_weather_get(input_data: WeatheractionWeatherGetParams) -> str:\n"));
        assert!(code.contains("params_dump = _dump_input(input_data)"));
        assert!(code.contains("body_dump = {}"));
        assert!(code.contains("\"apiPath\": \"/weather\""));
        assert!(code.contains("_invoke_action_group(\"arn:aws:lambda:eu-west-1:1:function:w\", \"eu-west-1\", payload)"));
        assert!(code.contains("return f\"Error executing weatheraction_weather_get: {str(e)}\""));
        assert!(!code.contains("{{"));
    }

    #[test]
    fn composed_inputs_split_parameters_and_body() {
        let tool = openapi_tool(
            ToolInput::Typed(TypeRef::Named("Input".into())),
            true,
            Some("text/plain"),
        );
        let code = render_tool(&tool, "@tool");
        assert!(code.contains("params_dump = model_dump.get(\"parameters\") or {}"));
        assert!(code.contains("body_dump.pop(\"content_type_annotation\", \"text/plain\")"));
    }

    #[test]
    fn stubs_ask_the_operator() {
        let mut tool = openapi_tool(ToolInput::None, false, None);
        tool.body = ToolBody::InteractiveStub;
        let code = render_tool(&tool, "@tool");
        assert_eq!(
            code,
            "@tool\ndef weatheraction_weather_get() -> str:\n    \"\"\"Get the weather\"\"\"\n    return input(\"Return of control: weatheraction_weather_get was called, enter desired output:\")"
        );
    }

    #[test]
    fn function_tools_send_typed_parameters() {
        let tool = Tool {
            name: "orders_lookup".into(),
            description: "Lookup".into(),
            action_group: "Orders".into(),
            input: ToolInput::Typed(TypeRef::Named("OrdersLookupInput".into())),
            body: ToolBody::Invoke {
                function_ref: "fn".into(),
                region: "us-west-2".into(),
            },
            operation: Operation::Function {
                name: "lookup".into(),
                parameter_types: vec![("id".into(), "integer".into())],
            },
            input_schema: json!({}),
        };
        let code = render_tool(&tool, "@tool");
        assert!(code.contains("parameter_types = {\"id\": \"integer\"}"));
        assert!(code.contains("\"function\": \"lookup\""));
    }

    #[test]
    fn helpers_embed_agent_metadata() {
        let agent = AgentDefinition {
            name: "weather".into(),
            id: "A1".into(),
            version: "DRAFT".into(),
            ..Default::default()
        };
        let code = render_helpers(&agent);
        assert!(code.starts_with("AGENT_METADATA = {\n    \"name\": \"weather\",\n    \"id\": \"A1\",\n    \"alias\": \"\",\n    \"version\": \"DRAFT\",\n}"));
        assert!(code.contains("def _invoke_action_group(function_ref, region, payload):"));
    }
}
