//! Long-term memory wiring for generated agents.
//!
//! A managed variant binds to a remote memory resource with a fixed
//! rolling-summary strategy. The self-contained variant ships the
//! `ltm_memory_manager` support module and keeps summaries in a JSON file
//! next to the agent module. Every self-contained manager in a tree is bound
//! to the session coordinator the root module creates.

use serde::Serialize;

use crate::emit::format::fill;
use crate::emit::python::string_literal;
use crate::model::AgentDefinition;

/// Support module written once per run when any agent is self-contained.
pub const MEMORY_MANAGER_FILE: &str = "ltm_memory_manager.py";
pub const MEMORY_MANAGER_SOURCE: &str = include_str!("../../assets/ltm_memory_manager.py");

/// Summarization strategy attached to every managed memory resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedMemoryStrategy {
    pub name: String,
    pub namespaces: Vec<String>,
}

impl ManagedMemoryStrategy {
    pub fn session_summarizer() -> Self {
        Self {
            name: "SessionSummarizer".to_string(),
            namespaces: vec!["/summaries/{actorId}/{sessionId}".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryVariant {
    Disabled,
    Managed {
        memory_id: String,
        region: String,
    },
    SelfContained {
        max_sessions: u32,
        max_days: u32,
        storage_file: String,
    },
}

impl MemoryVariant {
    /// Self-contained variant for `agent` emitted as `module`, or `Disabled`
    /// when the agent has no memory. Managed bindings are built by the
    /// caller once the resource is provisioned.
    pub fn self_contained(agent: &AgentDefinition, module: &str) -> Self {
        match &agent.memory {
            Some(config) if agent.memory_enabled() => MemoryVariant::SelfContained {
                max_sessions: config.max_recent_sessions,
                max_days: config.storage_days,
                storage_file: format!("session_summaries_{module}.json"),
            },
            _ => MemoryVariant::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, MemoryVariant::Disabled)
    }

    pub fn needs_coordinator(&self) -> bool {
        matches!(self, MemoryVariant::SelfContained { .. })
    }

    pub fn imports(&self) -> &'static str {
        match self {
            MemoryVariant::Disabled => "",
            MemoryVariant::Managed { .. } => "from bedrock_agentcore.memory import MemoryClient",
            MemoryVariant::SelfContained { .. } => "from ltm_memory_manager import LongTermMemoryManager",
        }
    }

    /// Long-term half of the memory section. `platform` names the
    /// summarizer calling convention of the self-contained manager.
    pub fn render(&self, platform: &str) -> String {
        match self {
            MemoryVariant::Disabled => String::new(),
            MemoryVariant::Managed { memory_id, region } => fill(
                MANAGED,
                &[
                    ("region", &string_literal(region)),
                    ("memory_id", &string_literal(memory_id)),
                ],
            ),
            MemoryVariant::SelfContained {
                max_sessions,
                max_days,
                storage_file,
            } => fill(
                SELF_CONTAINED,
                &[
                    ("max_sessions", &max_sessions.to_string()),
                    ("max_days", &max_days.to_string()),
                    ("platform", &string_literal(platform)),
                    ("storage_file", &string_literal(storage_file)),
                ],
            ),
        }
    }

    /// Statement assigning `memory_synopsis` before the agent is built.
    pub fn synopsis(&self) -> &'static str {
        match self {
            MemoryVariant::Disabled => "",
            MemoryVariant::Managed { .. } => MANAGED_SYNOPSIS,
            MemoryVariant::SelfContained { .. } => "memory_synopsis = memory_manager.get_memory_synopsis()",
        }
    }

    /// Condition under which the cached agent is rebuilt.
    pub fn rebuild_condition(&self) -> &'static str {
        match self {
            MemoryVariant::SelfContained { .. } => "_agent is None or memory_manager.has_memory_changed()",
            _ => "_agent is None",
        }
    }

    /// Statement recording one turn, for managers that collect turns locally.
    pub fn record_turn(&self, role: &str, content: &str) -> Option<String> {
        match self {
            MemoryVariant::SelfContained { .. } => Some(format!(
                "memory_manager.add_message({{\"role\": {}, \"content\": {content}}})",
                string_literal(role)
            )),
            _ => None,
        }
    }

    /// Statement storing the exchange of one entrypoint call remotely.
    pub fn store_exchange(&self) -> Option<&'static str> {
        match self {
            MemoryVariant::Managed { .. } => Some(MANAGED_EVENT),
            _ => None,
        }
    }
}

const MANAGED: &str = r#"memory_client = MemoryClient(region_name={{region}})
memory_id = {{memory_id}}"#;

const MANAGED_SYNOPSIS: &str = r#"memories = memory_client.retrieve_memories(
    memory_id=memory_id,
    namespace=f"/summaries/{user_id}",
    query="Retrieve the most recent session summaries.",
    actor_id=user_id,
    top_k=20,
)
memory_synopsis = "\n".join([m.get("content", {}).get("text", "") for m in memories])"#;

const MANAGED_EVENT: &str = r#"memory_client.create_event(
    memory_id=memory_id,
    actor_id=user_id,
    session_id=session_id,
    messages=formatted_messages,
)"#;

const SELF_CONTAINED: &str = r#"memory_manager = LongTermMemoryManager(
    llm_MEMORY_SUMMARIZATION,
    storage_path=os.path.join(os.path.dirname(os.path.abspath(__file__)), {{storage_file}}),
    max_sessions={{max_sessions}},
    summarization_prompt=MEMORY_TEMPLATE,
    max_days={{max_days}},
    platform={{platform}},
)"#;

/// `bind_session_coordinator` for a module. `children` are the local aliases
/// of the bind functions of collaborators whose subtrees hold managers.
pub fn render_coordinator_binding(registers_self: bool, children: &[String]) -> String {
    let mut body: Vec<String> = Vec::new();
    if registers_self {
        body.push("    coordinator.register(memory_manager)".to_string());
    }
    for child in children {
        body.push(format!("    {child}(coordinator)"));
    }
    if body.is_empty() {
        body.push("    pass".to_string());
    }
    format!(
        "def bind_session_coordinator(coordinator):\n{}",
        body.join("\n")
    )
}

/// Root-only wiring: create the coordinator and bind the whole tree to it.
pub const ROOT_COORDINATOR: &str = "session_coordinator = SessionCoordinator()\nbind_session_coordinator(session_coordinator)";
pub const ROOT_COORDINATOR_IMPORT: &str = "from ltm_memory_manager import SessionCoordinator";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryConfig;

    fn agent_with_memory() -> AgentDefinition {
        AgentDefinition {
            name: "helper".into(),
            memory: Some(MemoryConfig {
                enabled_memory_types: vec!["SESSION_SUMMARY".into()],
                storage_days: 7,
                max_recent_sessions: 3,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn strategy_is_a_fixed_session_summarizer() {
        let strategy = ManagedMemoryStrategy::session_summarizer();
        assert_eq!(strategy.name, "SessionSummarizer");
        assert_eq!(strategy.namespaces, vec!["/summaries/{actorId}/{sessionId}"]);
    }

    #[test]
    fn agents_without_memory_types_are_disabled() {
        let mut agent = agent_with_memory();
        agent.memory = Some(MemoryConfig {
            enabled_memory_types: vec![],
            storage_days: 30,
            max_recent_sessions: 20,
        });
        let variant = MemoryVariant::self_contained(&agent, "strands_helper");
        assert_eq!(variant, MemoryVariant::Disabled);
        assert!(!variant.is_enabled());
        assert_eq!(variant.render("strands"), "");
        assert_eq!(variant.rebuild_condition(), "_agent is None");
    }

    #[test]
    fn self_contained_manager_uses_configured_limits() {
        let variant = MemoryVariant::self_contained(&agent_with_memory(), "langchain_helper");
        assert!(variant.needs_coordinator());
        let code = variant.render("langchain");
        assert!(code.contains("max_sessions=3,"));
        assert!(code.contains("max_days=7,"));
        assert!(code.contains("platform=\"langchain\","));
        assert!(code.contains("\"session_summaries_langchain_helper.json\""));
        assert_eq!(
            variant.record_turn("user", "question").as_deref(),
            Some("memory_manager.add_message({\"role\": \"user\", \"content\": question})")
        );
        assert!(variant.store_exchange().is_none());
    }

    #[test]
    fn managed_binding_stores_events() {
        let variant = MemoryVariant::Managed {
            memory_id: "mem-123".into(),
            region: "us-east-1".into(),
        };
        assert!(!variant.needs_coordinator());
        assert_eq!(
            variant.render("strands"),
            "memory_client = MemoryClient(region_name=\"us-east-1\")\nmemory_id = \"mem-123\""
        );
        assert!(variant.synopsis().contains("namespace=f\"/summaries/{user_id}\""));
        assert!(variant.store_exchange().is_some_and(|s| s.contains("create_event")));
        assert!(variant.record_turn("user", "q").is_none());
    }

    #[test]
    fn coordinator_binding_cascades_to_children() {
        let code = render_coordinator_binding(true, &["bind_billing_session_coordinator".into()]);
        assert_eq!(
            code,
            "def bind_session_coordinator(coordinator):\n    coordinator.register(memory_manager)\n    bind_billing_session_coordinator(coordinator)"
        );
        assert!(render_coordinator_binding(false, &[]).ends_with("    pass"));
    }

    #[test]
    fn support_module_defines_the_coordinator() {
        assert!(MEMORY_MANAGER_SOURCE.contains("class SessionCoordinator"));
        assert!(MEMORY_MANAGER_SOURCE.contains("def end_all_sessions(self)"));
        assert!(!MEMORY_MANAGER_SOURCE.contains("weakref"));
    }
}
