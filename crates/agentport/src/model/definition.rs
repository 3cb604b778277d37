//! Agent definitions: the immutable input of one translation run.
//!
//! Definitions arrive fully resolved from whatever front-end loaded them.
//! Field names follow snake_case; enum values accept the upper-case spellings
//! agent exports use (`SUPERVISOR_ROUTER`, `ORCHESTRATION`, ...).

use serde::{Deserialize, Deserializer};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "DRAFT".to_string()
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_type_tag() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub model_id: String,
    /// Model provider family; resolved from `model_id` when absent.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default)]
    pub guardrail: Option<GuardrailRef>,
    #[serde(default)]
    pub action_groups: Vec<ActionGroup>,
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBase>,
    #[serde(default)]
    pub collaboration: CollaborationMode,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    #[serde(default)]
    pub prompts: Vec<PromptConfig>,
    #[serde(default)]
    pub memory: Option<MemoryConfig>,
    #[serde(default)]
    pub primitives: EnabledPrimitives,
}

impl AgentDefinition {
    /// Identity used for cycle detection: the agent id, else its name.
    pub fn identity(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    /// Enabled action groups that carry a schema (built-in groups excluded).
    pub fn custom_action_groups(&self) -> impl Iterator<Item = &ActionGroup> {
        self.action_groups
            .iter()
            .filter(|g| g.enabled && g.builtin.is_none())
    }

    pub fn has_builtin(&self, kind: BuiltinAction) -> bool {
        self.action_groups
            .iter()
            .any(|g| g.enabled && g.builtin == Some(kind))
    }

    pub fn has_action_groups(&self) -> bool {
        self.action_groups.iter().any(|g| g.enabled)
    }

    /// True when the definition configures at least one memory type.
    pub fn memory_enabled(&self) -> bool {
        self.memory
            .as_ref()
            .is_some_and(|m| !m.enabled_memory_types.is_empty())
    }

    pub fn collaboration_enabled(&self) -> bool {
        self.collaboration != CollaborationMode::Disabled && !self.collaborators.is_empty()
    }

    pub fn is_router(&self) -> bool {
        self.collaboration_enabled() && self.collaboration == CollaborationMode::SupervisorRouter
    }

    pub fn prompt(&self, kind: PromptType) -> Option<&PromptConfig> {
        self.prompts
            .iter()
            .find(|p| p.prompt_type == kind && p.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardrailRef {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EnabledPrimitives {
    #[serde(default)]
    pub gateway: bool,
    #[serde(default)]
    pub memory: bool,
    #[serde(default)]
    pub code_interpreter: bool,
    #[serde(default)]
    pub observability: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationMode {
    #[default]
    #[serde(alias = "DISABLED")]
    Disabled,
    #[serde(alias = "SUPERVISOR")]
    Supervisor,
    #[serde(alias = "SUPERVISOR_ROUTER")]
    SupervisorRouter,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub executor: Executor,
    #[serde(default)]
    pub schema: Option<ActionSchema>,
    #[serde(default)]
    pub builtin: Option<BuiltinAction>,
}

impl ActionGroup {
    /// Backing function reference, when the group is backed by one.
    pub fn function_ref(&self) -> Option<&str> {
        match &self.executor {
            Executor::Function { function_ref } if !function_ref.is_empty() => {
                Some(function_ref.as_str())
            }
            _ => None,
        }
    }
}

/// How an action group's operations execute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Executor {
    /// Invoke a remote backing function.
    Function { function_ref: String },
    /// Hand control back to the operator.
    #[default]
    ReturnControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinAction {
    UserInput,
    CodeInterpreter,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSchema {
    /// OpenAPI document; operations live under `paths`.
    OpenApi { document: JsonValue },
    Functions { functions: Vec<FunctionSpec> },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "parameters_from_map")]
    pub parameters: Vec<ParameterSpec>,
}

/// One OpenAPI `path × method` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationSpec {
    pub path: String,
    pub method: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Vec<MediaSchema>,
    pub request_body_required: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub location: ParameterLocation,
    /// Nested schema; function parameters carry `{"type": <tag>}`.
    pub schema: Option<JsonValue>,
    /// Per-media-type schemas for parameters declared through `content`.
    pub content: Vec<MediaSchema>,
}

impl ParameterSpec {
    /// Raw type tag, `string` when the schema does not name one.
    pub fn type_tag(&self) -> &str {
        self.schema
            .as_ref()
            .and_then(|s| s.get("type"))
            .and_then(JsonValue::as_str)
            .unwrap_or("string")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterLocation {
    #[default]
    Query,
    Path,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Location named by an OpenAPI `in` value; unknown values read as query.
    pub fn from_openapi(value: &str) -> Self {
        match value {
            "path" => ParameterLocation::Path,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            _ => ParameterLocation::Query,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSchema {
    pub media_type: String,
    pub schema: JsonValue,
}

#[derive(Deserialize)]
struct RawFunctionParameter {
    #[serde(rename = "type", default = "default_type_tag")]
    type_tag: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
}

/// Function parameters arrive as a name-keyed map; order is preserved.
fn parameters_from_map<'de, D>(deserializer: D) -> Result<Vec<ParameterSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = JsonMap::<String, JsonValue>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, value)| {
            let param: RawFunctionParameter =
                serde_json::from_value(value).map_err(serde::de::Error::custom)?;
            Ok(ParameterSpec {
                name,
                description: param.description,
                required: param.required,
                location: ParameterLocation::Query,
                schema: Some(json!({ "type": param.type_tag })),
                content: Vec::new(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeBase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub id: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collaborator {
    /// Name the parent uses to invoke this collaborator.
    pub name: String,
    #[serde(default)]
    pub instruction: String,
    /// Forward prior conversation turns into the sub-agent.
    #[serde(default)]
    pub relay_history: bool,
    pub agent: AgentDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptType {
    Orchestration,
    PreProcessing,
    PostProcessing,
    MemorySummarization,
    KnowledgeBaseResponseGeneration,
    RoutingClassifier,
}

impl PromptType {
    pub const ALL: [PromptType; 6] = [
        PromptType::Orchestration,
        PromptType::PreProcessing,
        PromptType::PostProcessing,
        PromptType::MemorySummarization,
        PromptType::KnowledgeBaseResponseGeneration,
        PromptType::RoutingClassifier,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptType::Orchestration => "ORCHESTRATION",
            PromptType::PreProcessing => "PRE_PROCESSING",
            PromptType::PostProcessing => "POST_PROCESSING",
            PromptType::MemorySummarization => "MEMORY_SUMMARIZATION",
            PromptType::KnowledgeBaseResponseGeneration => "KNOWLEDGE_BASE_RESPONSE_GENERATION",
            PromptType::RoutingClassifier => "ROUTING_CLASSIFIER",
        }
    }

    /// Name of the generated template constant.
    pub fn constant_name(self) -> &'static str {
        match self {
            PromptType::Orchestration => "ORCHESTRATION_TEMPLATE",
            PromptType::PreProcessing => "PRE_PROCESSING_TEMPLATE",
            PromptType::PostProcessing => "POST_PROCESSING_TEMPLATE",
            PromptType::MemorySummarization => "MEMORY_TEMPLATE",
            PromptType::KnowledgeBaseResponseGeneration => "KB_GENERATION_TEMPLATE",
            PromptType::RoutingClassifier => "ROUTING_TEMPLATE",
        }
    }

    /// Name of the generated model handle for this prompt.
    pub fn model_handle(self) -> String {
        format!("llm_{}", self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub prompt_type: PromptType,
    /// A plain string or a structured chat template.
    #[serde(default)]
    pub base_template: JsonValue,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub maximum_length: u32,
    pub stop_sequences: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            top_k: 250,
            maximum_length: 2048,
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub enabled_memory_types: Vec<String>,
    #[serde(default = "default_storage_days")]
    pub storage_days: u32,
    #[serde(default = "default_max_recent_sessions")]
    pub max_recent_sessions: u32,
}

fn default_storage_days() -> u32 {
    30
}

fn default_max_recent_sessions() -> u32 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_parameters_keep_declaration_order() {
        let spec: FunctionSpec = serde_json::from_value(json!({
            "name": "lookup",
            "parameters": {
                "zeta": {"type": "integer", "required": true},
                "alpha": {"description": "first letter"}
            }
        }))
        .expect("parse function spec");
        let names: Vec<_> = spec.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(spec.parameters[0].type_tag(), "integer");
        assert!(spec.parameters[0].required);
        assert_eq!(spec.parameters[1].type_tag(), "string");
        assert!(!spec.parameters[1].required);
    }

    #[test]
    fn upper_case_enum_spellings_are_accepted() {
        let def: AgentDefinition = serde_json::from_value(json!({
            "name": "router",
            "model_id": "anthropic.claude-3-haiku-20240307-v1:0",
            "collaboration": "SUPERVISOR_ROUTER",
            "prompts": [{"prompt_type": "ROUTING_CLASSIFIER", "base_template": "x"}]
        }))
        .expect("parse definition");
        assert_eq!(def.collaboration, CollaborationMode::SupervisorRouter);
        assert_eq!(def.prompts[0].prompt_type, PromptType::RoutingClassifier);
        assert_eq!(def.version, "DRAFT");
        assert_eq!(def.idle_timeout_secs, 600);
        assert_eq!(def.prompts[0].inference.top_k, 250);
    }

    #[test]
    fn executor_and_schema_are_tagged() {
        let group: ActionGroup = serde_json::from_value(json!({
            "name": "WeatherAction",
            "executor": {"kind": "function", "function_ref": "arn:aws:lambda:eu-west-1:1:function:w"},
            "schema": {"kind": "functions", "functions": [{"name": "now"}]}
        }))
        .expect("parse group");
        assert_eq!(group.function_ref(), Some("arn:aws:lambda:eu-west-1:1:function:w"));
        assert!(matches!(group.schema, Some(ActionSchema::Functions { .. })));
        assert!(group.enabled);
    }

    #[test]
    fn router_requires_collaborators() {
        let def = AgentDefinition {
            name: "solo".into(),
            collaboration: CollaborationMode::SupervisorRouter,
            ..Default::default()
        };
        assert!(!def.collaboration_enabled());
        assert!(!def.is_router());
        assert_eq!(def.identity(), "solo");
    }
}
