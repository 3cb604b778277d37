use std::collections::HashMap;

use rust_mcp_schema::{Tool as McpTool, ToolInputSchema};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::tools::{Tool, ToolGroup};

/// Registration of one action group behind a gateway.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayTargetRequest {
    /// Target name; also the namespace of its dispatch keys.
    pub name: String,
    pub action_group: String,
    pub tools: Vec<McpTool>,
}

/// MCP descriptor advertising `tool` with its JSON Schema input.
pub fn mcp_tool(tool: &Tool) -> McpTool {
    let required: Vec<String> = tool
        .input_schema
        .get("required")
        .and_then(JsonValue::as_array)
        .map(|r| r.iter().filter_map(JsonValue::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let properties: HashMap<String, JsonMap<String, JsonValue>> = tool
        .input_schema
        .get("properties")
        .and_then(JsonValue::as_object)
        .map(|props| {
            props
                .iter()
                .filter_map(|(k, v)| v.as_object().map(|o| (k.clone(), o.clone())))
                .collect()
        })
        .unwrap_or_default();
    McpTool {
        annotations: None,
        description: Some(tool.description.clone()),
        execution: None,
        icons: Vec::new(),
        input_schema: ToolInputSchema::new(required, Some(properties), None),
        meta: None,
        name: tool.name.clone(),
        output_schema: None,
        title: None,
    }
}

/// One target per function-backed group that has tools.
pub fn gateway_targets(groups: &[ToolGroup]) -> Vec<GatewayTargetRequest> {
    groups
        .iter()
        .filter(|g| g.function_ref.is_some() && !g.tools.is_empty())
        .map(|g| GatewayTargetRequest {
            name: g.namespace.clone(),
            action_group: g.action_group.clone(),
            tools: g.tools.iter().map(mcp_tool).collect(),
        })
        .collect()
}
