//! Tool synthesis from action groups.

pub mod openapi;
pub mod render;
pub mod synth;

use serde_json::Value as JsonValue;

use crate::model::TypeRef;

pub use synth::ToolSynthesizer;

/// Region used when a function reference does not carry one.
pub const DEFAULT_FUNCTION_REGION: &str = "us-west-2";

/// Region of a backing function: the fourth `:`-separated component of its
/// reference.
pub fn function_region(function_ref: &str) -> String {
    function_ref
        .split(':')
        .nth(3)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_FUNCTION_REGION)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInput {
    None,
    Typed(TypeRef),
    /// The schema could not be typed; the tool takes a plain mapping.
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolBody {
    Invoke { function_ref: String, region: String },
    InteractiveStub,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    OpenApi {
        path: String,
        method: String,
        has_parameters: bool,
        /// Media type used when the caller does not name one.
        default_media_type: Option<String>,
    },
    Function {
        name: String,
        /// Declared type tag per parameter, in declaration order.
        parameter_types: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub action_group: String,
    pub input: ToolInput,
    pub body: ToolBody,
    pub operation: Operation,
    /// JSON Schema advertised for the tool input.
    pub input_schema: JsonValue,
}

impl Tool {
    pub fn is_backed(&self) -> bool {
        matches!(self.body, ToolBody::Invoke { .. })
    }
}

/// Tools of one action group.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolGroup {
    pub action_group: String,
    /// Cleaned group name used as gateway namespace.
    pub namespace: String,
    pub function_ref: Option<String>,
    pub tools: Vec<Tool>,
}

impl ToolGroup {
    /// Groups served through a gateway are not emitted as local tools.
    pub fn is_proxied(&self, gateway: bool) -> bool {
        gateway && self.function_ref.is_some()
    }
}
