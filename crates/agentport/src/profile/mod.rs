//! Target runtime profiles.
//!
//! Both profiles share the module layout assembled in [`module`]; a backend
//! only supplies the text that differs: imports, model declarations,
//! retrieval and collaborator tools, short-term memory and the statements
//! that drive the agent.

pub mod common;
pub mod langgraph;
pub mod module;
pub mod strands;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collab::CollaboratorLink;
use crate::model::{GuardrailRef, InferenceConfig, KnowledgeBase, PromptType};
use crate::modelmap::ResolvedModel;

pub use module::{GatewayBinding, ModulePlan, render_module};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Graph/checkpoint-based multi-step orchestration.
    #[default]
    Langgraph,
    /// Single-loop conversational orchestration.
    Strands,
}

impl Profile {
    pub fn backend(self) -> &'static dyn ProfileBackend {
        match self {
            Profile::Langgraph => &langgraph::LanggraphBackend,
            Profile::Strands => &strands::StrandsBackend,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Langgraph => f.write_str("langgraph"),
            Profile::Strands => f.write_str("strands"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "langgraph" | "langchain" | "a" => Ok(Profile::Langgraph),
            "strands" | "b" => Ok(Profile::Strands),
            other => Err(format!("unknown profile '{other}' (expected langgraph or strands)")),
        }
    }
}

/// A knowledge-base tool: the name it is registered under and its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseTool {
    pub tool_name: String,
    pub code: String,
}

/// Statements of `invoke_agent` that differ per profile.
#[derive(Debug, Clone, Copy)]
pub struct InvokeParts {
    /// Applies `relayed_messages` to the agent.
    pub relay: &'static str,
    /// Assigns `messages`, the serialized conversation the router classifies.
    pub conversation: &'static str,
    /// Expression for the turns relayed to a routed collaborator.
    pub history: &'static str,
    /// Assigns `routing_choice` from `routing_template`.
    pub classify: &'static str,
    /// Assigns `pre_process_output`.
    pub pre_process: &'static str,
    /// Runs the agent on `question` and assigns `response`.
    pub run: &'static str,
    pub latest_response: &'static str,
    pub responses: &'static str,
    /// Post-processes `post_process_prompt` and returns.
    pub post_process: &'static str,
    pub plain_return: &'static str,
}

pub trait ProfileBackend: Send + Sync {
    /// Platform name; also prefixes module names.
    fn platform(&self) -> &'static str;

    fn requirements(&self) -> &'static str;

    fn imports(&self) -> &'static str;

    fn mcp_imports(&self) -> &'static str;

    /// Import and setup statements enabling tracing of the agent runtime.
    fn observability(&self) -> (&'static str, &'static str);

    fn model(
        &self,
        kind: PromptType,
        model: &ResolvedModel,
        region: &str,
        inference: &InferenceConfig,
        guardrail: Option<&GuardrailRef>,
    ) -> String;

    fn knowledge_base_tool(&self, kb: &KnowledgeBase, region: &str) -> KnowledgeBaseTool;

    fn collaborator_tool(&self, link: &CollaboratorLink) -> String;

    /// Assigns `mcp_tools` from `mcp_url` and `headers`.
    fn mcp_client(&self) -> &'static str;

    fn short_term_memory(&self) -> &'static str;

    /// Builds `coding_agent` from `coding_tools` and returns its answer to
    /// `original_question`.
    fn coding_agent(&self) -> &'static str;

    /// Module-level helpers and state preceding `get_agent`.
    fn agent_helpers(&self) -> &'static str;

    /// Assigns `_agent` from `system_prompt` and `tools`.
    fn build_agent(&self) -> &'static str;

    fn invoke_parts(&self) -> InvokeParts;

    /// Records tool names from `agent_result` into `tools_used`.
    fn tools_used_update(&self) -> &'static str;

    /// Expression for the text of `agent_result`.
    fn response_content(&self) -> &'static str;
}
