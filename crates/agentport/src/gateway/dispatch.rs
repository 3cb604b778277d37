//! Source of the dispatch function that fronts an agent's backing functions.

use serde::Serialize;
use serde_json::json;

use super::routing::{RoutingEntry, routing_json};
use crate::emit::format::fill;
use crate::emit::python::pretty_literal;
use crate::model::{AgentDefinition, MAX_IDENTIFIER_LEN, bound_identifier, clean_variable_name};

const HANDLER: &str = r#"import boto3
import json

agent_metadata = {{metadata}}
tool_mappings = {{mappings}}


def get_json_type(value):
    if isinstance(value, str):
        return "string"
    elif isinstance(value, bool):
        return "boolean"
    elif isinstance(value, int):
        return "integer"
    elif isinstance(value, float):
        return "number"
    elif isinstance(value, list):
        return "array"
    elif isinstance(value, dict):
        return "object"
    elif value is None:
        return "null"
    return "unknown"


def transform_object(event_obj):
    result = []
    for key, value in event_obj.items():
        json_type = get_json_type(value)
        if json_type == "array":
            value = [transform_object(item) if isinstance(item, dict) else item for item in value]
        elif json_type == "object":
            value = transform_object(value)
        result.append({"name": key, "value": value, "type": json_type})
    return result


def lambda_handler(event, context):
    custom = context.client_context.custom if context.client_context else {}
    tool_name = custom.get("bedrockAgentCoreToolName", "")
    session_id = custom.get("bedrockAgentCoreSessionId", "")

    tool_info = tool_mappings.get(tool_name)
    if not tool_info:
        return {"statusCode": 400, "body": f"Tool {tool_name} not found"}

    lambda_client = boto3.client("lambda", region_name=tool_info.get("lambdaRegion", "us-west-2"))

    payload = {
        "messageVersion": "1.0",
        "agent": agent_metadata,
        "actionGroup": tool_info.get("actionGroup", ""),
        "sessionId": session_id,
        "sessionAttributes": {},
        "promptSessionAttributes": {},
        "inputText": "",
    }

    if tool_info.get("type") == "openapi":
        request_body = dict(event.get("requestBody") or {})
        content_type = request_body.pop("contentType", "application/json")
        payload.update({
            "apiPath": tool_info.get("apiPath", ""),
            "httpMethod": tool_info.get("httpMethod", "GET"),
            "parameters": transform_object(event.get("parameters") or {}),
            "requestBody": {
                "content": {
                    content_type: {"properties": transform_object(request_body)}
                }
            },
        })
    else:
        payload.update({
            "function": tool_info.get("function", ""),
            "parameters": transform_object(event),
        })

    try:
        response = lambda_client.invoke(
            FunctionName=tool_info.get("lambdaArn", ""),
            InvocationType="RequestResponse",
            Payload=json.dumps(payload),
        )
        response_payload = json.loads(response["Payload"].read().decode("utf-8"))
        return {"statusCode": 200, "body": json.dumps(response_payload)}
    except Exception as e:
        return {"statusCode": 500, "body": f"Error invoking Lambda: {str(e)}"}
"#;

/// A dispatch function ready to be deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFunction {
    pub name: String,
    pub region: String,
    pub handler: String,
    pub routing: Vec<RoutingEntry>,
    #[serde(skip)]
    pub source: String,
}

impl DispatchFunction {
    /// File the source is written to, relative to the output directory.
    pub fn file_name(&self) -> String {
        format!("{}.py", self.name)
    }
}

pub fn dispatch_function(agent: &AgentDefinition, routing: Vec<RoutingEntry>) -> DispatchFunction {
    let name = bound_identifier(
        &format!("{}_gateway_proxy", clean_variable_name(&agent.name)),
        MAX_IDENTIFIER_LEN,
    );
    let metadata = json!({
        "name": agent.name,
        "id": agent.id,
        "alias": agent.alias,
        "version": agent.version,
    });
    let source = fill(
        HANDLER,
        &[
            ("metadata", &pretty_literal(&metadata)),
            ("mappings", &pretty_literal(&routing_json(&routing))),
        ],
    );
    DispatchFunction {
        handler: format!("{name}.lambda_handler"),
        name,
        region: agent.region.clone(),
        routing,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::routing::RoutedOperation;

    #[test]
    fn source_embeds_routing_table() {
        let agent = AgentDefinition {
            name: "Weather Bot".into(),
            region: "eu-west-1".into(),
            ..Default::default()
        };
        let routing = vec![RoutingEntry {
            key: "weatheraction___weatheraction_weather_get".into(),
            action_group: "WeatherAction".into(),
            operation: RoutedOperation::OpenApi {
                path: "/weather".into(),
                method: "GET".into(),
            },
            function_ref: "arn:aws:lambda:eu-west-1:1:function:w".into(),
            region: "eu-west-1".into(),
        }];
        let dispatch = dispatch_function(&agent, routing);
        assert_eq!(dispatch.name, "weather_bot_gateway_proxy");
        assert_eq!(dispatch.file_name(), "weather_bot_gateway_proxy.py");
        assert_eq!(dispatch.handler, "weather_bot_gateway_proxy.lambda_handler");
        assert!(dispatch.source.contains("\"weatheraction___weatheraction_weather_get\": {"));
        assert!(dispatch.source.contains("bedrockAgentCoreToolName"));
        assert!(dispatch.source.contains("\"statusCode\": 400"));
        assert!(!dispatch.source.contains("{{"));
    }
}
