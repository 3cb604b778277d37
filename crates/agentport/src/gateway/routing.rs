use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue, json};

use crate::model::dispatch_key;
use crate::tools::{Operation, ToolGroup, function_region};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutedOperation {
    OpenApi { path: String, method: String },
    Function { name: String },
}

/// One dispatch key of a gateway proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingEntry {
    pub key: String,
    pub action_group: String,
    pub operation: RoutedOperation,
    pub function_ref: String,
    pub region: String,
}

/// Entries for every tool of every function-backed group, in tool order.
pub fn routing_table(groups: &[ToolGroup]) -> Vec<RoutingEntry> {
    let mut entries = Vec::new();
    for group in groups {
        let Some(function_ref) = &group.function_ref else {
            continue;
        };
        for tool in &group.tools {
            let operation = match &tool.operation {
                Operation::OpenApi { path, method, .. } => RoutedOperation::OpenApi {
                    path: path.clone(),
                    method: method.clone(),
                },
                Operation::Function { name, .. } => RoutedOperation::Function { name: name.clone() },
            };
            entries.push(RoutingEntry {
                key: dispatch_key(&group.namespace, &tool.name),
                action_group: group.action_group.clone(),
                operation,
                function_ref: function_ref.clone(),
                region: function_region(function_ref),
            });
        }
    }
    entries
}

/// Routing table in the shape the dispatch handler reads.
pub fn routing_json(entries: &[RoutingEntry]) -> JsonValue {
    let mut table = JsonMap::new();
    for entry in entries {
        let value = match &entry.operation {
            RoutedOperation::OpenApi { path, method } => json!({
                "actionGroup": entry.action_group,
                "apiPath": path,
                "httpMethod": method,
                "type": "openapi",
                "lambdaArn": entry.function_ref,
                "lambdaRegion": entry.region,
            }),
            RoutedOperation::Function { name } => json!({
                "actionGroup": entry.action_group,
                "function": name,
                "type": "structured",
                "lambdaArn": entry.function_ref,
                "lambdaRegion": entry.region,
            }),
        };
        table.insert(entry.key.clone(), value);
    }
    JsonValue::Object(table)
}
