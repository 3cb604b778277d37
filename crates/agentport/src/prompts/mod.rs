//! Prompt template compilation.
//!
//! A template is checked against the closed [`Placeholder`] set, fixture and
//! definition placeholders are filled in substitution order, and placeholders
//! of disabled features are removed. Runtime placeholders stay in the text
//! for the generated code to fill on each call.

pub mod defaults;
pub mod fixtures;
pub mod placeholder;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::emit::format::wrap_long_lines;
use crate::emit::python::triple_quoted;
use crate::error::{Result, TranslateError};
use crate::model::{AgentDefinition, BuiltinAction, InferenceConfig, PromptType};

pub use defaults::default_template;
pub use fixtures::FixtureTable;
pub use placeholder::{Feature, Phase, Placeholder, scan_tokens};

/// Column at which emitted templates are wrapped.
pub const WRAP_WIDTH: usize = 150;

/// Phrase referring to a tool the generated agents do not have.
const AGENT_COMMUNICATION_PHRASE: &str = "using the AgentCommunication__sendMessage tool";

/// Capabilities of one agent, as far as placeholders care.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub knowledge_bases: bool,
    pub memory: bool,
    pub user_input: bool,
    pub action_groups: bool,
    pub code_interpreter: bool,
}

impl FeatureSet {
    pub fn of(agent: &AgentDefinition) -> Self {
        Self {
            knowledge_bases: !agent.knowledge_bases.is_empty(),
            memory: agent.memory_enabled(),
            user_input: agent.has_builtin(BuiltinAction::UserInput),
            action_groups: agent.has_action_groups(),
            code_interpreter: agent.has_builtin(BuiltinAction::CodeInterpreter),
        }
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::KnowledgeBases => self.knowledge_bases,
            Feature::Memory => self.memory,
            Feature::UserInput => self.user_input,
            Feature::ActionGroups => self.action_groups,
            Feature::CodeInterpreter => self.code_interpreter,
        }
    }

    fn keeps(&self, placeholder: Placeholder) -> bool {
        placeholder.feature().is_none_or(|f| self.enabled(f))
    }
}

/// Values of the definition-phase placeholders for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionValues {
    pub instruction: String,
    pub agent_collaborators: String,
    pub reachable_agents: String,
    pub tools_for_routing: String,
    pub knowledge_bases_for_routing: String,
}

impl DefinitionValues {
    fn get(&self, placeholder: Placeholder) -> Option<&str> {
        let value = match placeholder {
            Placeholder::Instruction => &self.instruction,
            Placeholder::AgentCollaborators => &self.agent_collaborators,
            Placeholder::ReachableAgents => &self.reachable_agents,
            Placeholder::ToolsForRouting => &self.tools_for_routing,
            Placeholder::KnowledgeBasesForRouting => &self.knowledge_bases_for_routing,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPrompt {
    pub kind: PromptType,
    pub template: String,
    pub inference: InferenceConfig,
}

/// Text of a configured base template.
///
/// Plain strings are used as is, unless they hold a serialized chat
/// template. Chat templates yield their `system` text, else the content of
/// their first message.
pub fn extract_template(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => {
            if text.trim_start().starts_with('{')
                && let Ok(parsed @ JsonValue::Object(_)) = serde_json::from_str::<JsonValue>(text)
                && (parsed.get("system").is_some() || parsed.get("messages").is_some())
            {
                return extract_template(&parsed);
            }
            text.clone()
        }
        JsonValue::Object(map) => {
            if let Some(system) = map
                .get("system")
                .and_then(JsonValue::as_str)
                .filter(|s| !s.trim().is_empty())
            {
                return system.to_string();
            }
            map.get("messages")
                .and_then(JsonValue::as_array)
                .and_then(|messages| messages.first())
                .map(|first| content_text(first.get("content")))
                .unwrap_or_default()
        }
        other => other.to_string(),
    }
}

fn content_text(content: Option<&JsonValue>) -> String {
    match content {
        Some(JsonValue::String(text)) => text.clone(),
        Some(JsonValue::Array(parts)) => parts
            .iter()
            .filter_map(|part| {
                part.get("text")
                    .and_then(JsonValue::as_str)
                    .or_else(|| part.as_str())
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

pub struct PromptCompiler<'a> {
    fixtures: &'a FixtureTable,
    features: FeatureSet,
    values: &'a DefinitionValues,
}

impl<'a> PromptCompiler<'a> {
    pub fn new(fixtures: &'a FixtureTable, features: FeatureSet, values: &'a DefinitionValues) -> Self {
        Self {
            fixtures,
            features,
            values,
        }
    }

    /// Compile one template. `prompt` names it in errors.
    pub fn compile_template(&self, prompt: &str, template: &str) -> Result<String> {
        for token in scan_tokens(template) {
            if Placeholder::from_name(token).is_none() {
                return Err(TranslateError::UnknownPlaceholder {
                    prompt: prompt.to_string(),
                    name: token.to_string(),
                });
            }
        }

        let mut text = template.to_string();
        for phase in [Phase::Fixture, Phase::Definition, Phase::Runtime] {
            for &placeholder in Placeholder::ALL.iter().filter(|p| p.phase() == phase) {
                let token = placeholder.token();
                if !text.contains(&token) {
                    continue;
                }
                let replacement = if !self.features.keeps(placeholder) {
                    debug!("{prompt}: removing {placeholder} (feature disabled)");
                    ""
                } else {
                    match phase {
                        Phase::Fixture => self.fixtures.get(placeholder).unwrap_or_default(),
                        Phase::Definition => self.values.get(placeholder).unwrap_or_default(),
                        Phase::Runtime => continue,
                    }
                };
                text = text.replace(&token, replacement);
            }
        }

        let text = text.replace(AGENT_COMMUNICATION_PHRASE, "");
        Ok(wrap_long_lines(&text, WRAP_WIDTH))
    }

    /// Every prompt the agent's module needs, in [`PromptType::ALL`] order.
    ///
    /// Knowledge-base generation needs knowledge bases, routing needs a
    /// router, memory summarization needs memory. Orchestration, routing and
    /// memory summarization fall back to built-in templates.
    pub fn compile(&self, agent: &AgentDefinition) -> Result<Vec<CompiledPrompt>> {
        let mut out = Vec::new();
        for kind in PromptType::ALL {
            let applicable = match kind {
                PromptType::KnowledgeBaseResponseGeneration => self.features.knowledge_bases,
                PromptType::RoutingClassifier => agent.is_router(),
                PromptType::MemorySummarization => self.features.memory,
                PromptType::Orchestration | PromptType::PreProcessing | PromptType::PostProcessing => {
                    true
                }
            };
            if !applicable {
                continue;
            }
            let configured = agent.prompt(kind).map(|config| {
                (extract_template(&config.base_template), config.inference.clone())
            });
            let (template, inference) = match configured {
                Some((text, inference)) if !text.trim().is_empty() => (text, inference),
                Some((_, inference)) => match default_template(kind) {
                    Some(text) => (text.to_string(), inference),
                    None => continue,
                },
                None => match default_template(kind) {
                    Some(text) => (text.to_string(), InferenceConfig::default()),
                    None => continue,
                },
            };
            out.push(CompiledPrompt {
                kind,
                template: self.compile_template(kind.as_str(), &template)?,
                inference,
            });
        }
        Ok(out)
    }
}

/// Template constants for the prompts section of a module.
pub fn render_prompts(prompts: &[CompiledPrompt]) -> String {
    prompts
        .iter()
        .map(|p| {
            format!(
                "{} = {}",
                p.kind.constant_name(),
                triple_quoted(&format!("\n{}\n", p.template.trim()))
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionGroup, KnowledgeBase, MemoryConfig, PromptConfig};
    use serde_json::json;

    fn agent_with(template: JsonValue) -> AgentDefinition {
        AgentDefinition {
            name: "helper".into(),
            instruction: "Be helpful.".into(),
            prompts: vec![PromptConfig {
                prompt_type: PromptType::Orchestration,
                base_template: template,
                inference: InferenceConfig::default(),
                enabled: true,
            }],
            ..Default::default()
        }
    }

    fn compile_one(agent: &AgentDefinition, template: &str) -> Result<String> {
        let fixtures = FixtureTable::built_in();
        let values = DefinitionValues {
            instruction: agent.instruction.clone(),
            ..Default::default()
        };
        PromptCompiler::new(&fixtures, FeatureSet::of(agent), &values)
            .compile_template("ORCHESTRATION", template)
    }

    #[test]
    fn chat_templates_use_system_then_first_message() {
        assert_eq!(extract_template(&json!("plain")), "plain");
        assert_eq!(extract_template(&json!({"system": "sys", "messages": []})), "sys");
        assert_eq!(
            extract_template(&json!({"messages": [{"role": "user", "content": "hello"}]})),
            "hello"
        );
        assert_eq!(
            extract_template(&json!({"messages": [{"content": [{"type": "text", "text": "a"}, {"text": "b"}]}]})),
            "a\nb"
        );
        let serialized = json!({"system": "inner"}).to_string();
        assert_eq!(extract_template(&JsonValue::String(serialized)), "inner");
        assert_eq!(extract_template(&JsonValue::Null), "");
    }

    #[test]
    fn unknown_placeholders_are_rejected() {
        let agent = agent_with(json!(""));
        let err = compile_one(&agent, "$instruction$ $mystery$").expect_err("unknown");
        assert!(matches!(
            err,
            TranslateError::UnknownPlaceholder { ref name, ref prompt } if name == "mystery" && prompt == "ORCHESTRATION"
        ));
    }

    #[test]
    fn disabled_features_strip_their_placeholders() {
        let agent = agent_with(json!(""));
        let out = compile_one(
            &agent,
            "$instruction$|$ask_user_missing_information$|$memory_content$|$knowledge_base_guideline$|$search_results$|$question$",
        )
        .expect("compile");
        assert_eq!(out, "Be helpful.|||||$question$");
    }

    #[test]
    fn enabled_features_fill_fixtures_and_keep_runtime_tokens() {
        let mut agent = agent_with(json!(""));
        agent.memory = Some(MemoryConfig {
            enabled_memory_types: vec!["SESSION_SUMMARY".into()],
            storage_days: 30,
            max_recent_sessions: 20,
        });
        agent.knowledge_bases.push(KnowledgeBase {
            name: "docs".into(),
            id: "KB1".into(),
            ..Default::default()
        });
        let out = compile_one(&agent, "$memory_content$ $search_results$").expect("compile");
        assert!(out.contains("$memory_synopsis$"));
        assert!(out.contains("<memory_synopsis>"));
        assert!(out.ends_with("$search_results$"));
    }

    #[test]
    fn compiled_prompts_are_closed_over_runtime_placeholders() {
        let mut agent = agent_with(json!({
            "system": "$instruction$ $agent_collaborators$ $prompt_session_attributes$ $code_interpreter_guideline$ using the AgentCommunication__sendMessage tool $memory_synopsis$"
        }));
        agent.action_groups.push(ActionGroup {
            name: "UserInputAction".into(),
            enabled: true,
            builtin: Some(BuiltinAction::UserInput),
            ..Default::default()
        });
        let fixtures = FixtureTable::built_in();
        let values = DefinitionValues {
            instruction: "Be helpful.".into(),
            agent_collaborators: "{\"agentName\": \"billing\"}".into(),
            ..Default::default()
        };
        let prompts = PromptCompiler::new(&fixtures, FeatureSet::of(&agent), &values)
            .compile(&agent)
            .expect("compile");
        assert_eq!(prompts.len(), 1);
        let text = &prompts[0].template;
        assert!(text.starts_with("Be helpful. {\"agentName\": \"billing\"}"));
        assert!(!text.contains("AgentCommunication"));
        for token in scan_tokens(text) {
            let p = Placeholder::from_name(token).expect("known placeholder");
            assert_eq!(p.phase(), Phase::Runtime, "{p} left in template");
            assert!(FeatureSet::of(&agent).keeps(p));
        }
    }

    #[test]
    fn required_prompts_fall_back_to_defaults() {
        let agent = AgentDefinition {
            name: "bare".into(),
            instruction: "Answer questions.".into(),
            ..Default::default()
        };
        let fixtures = FixtureTable::built_in();
        let values = DefinitionValues {
            instruction: agent.instruction.clone(),
            ..Default::default()
        };
        let prompts = PromptCompiler::new(&fixtures, FeatureSet::of(&agent), &values)
            .compile(&agent)
            .expect("compile");
        let kinds: Vec<_> = prompts.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PromptType::Orchestration]);
        assert!(prompts[0].template.starts_with("Answer questions."));
        assert!(!prompts[0].template.contains('$'));
    }

    #[test]
    fn long_lines_are_wrapped() {
        let agent = agent_with(json!(""));
        let long = "word ".repeat(60);
        let out = compile_one(&agent, &long).expect("compile");
        assert!(out.lines().all(|l| l.chars().count() <= WRAP_WIDTH));
    }

    #[test]
    fn prompts_render_as_triple_quoted_constants() {
        let rendered = render_prompts(&[CompiledPrompt {
            kind: PromptType::Orchestration,
            template: "Be helpful.".into(),
            inference: InferenceConfig::default(),
        }]);
        assert_eq!(rendered, "ORCHESTRATION_TEMPLATE = \"\"\"\nBe helpful.\n\"\"\"");
    }
}
