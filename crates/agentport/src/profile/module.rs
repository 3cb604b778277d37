//! Assembly of one generated agent module from its compiled parts.

use tracing::debug;

use super::ProfileBackend;
use super::common::{
    DriverOptions, GATEWAY_IMPORT, HEADER, USER_INPUT_TOOL, code_interpreter_import,
    render_code_interpreter, render_driver, render_entrypoint, render_usage,
};
use crate::collab::{CollaboratorLink, render_routes};
use crate::emit::ModuleSections;
use crate::gateway::render_client_setup;
use crate::memory::{MemoryVariant, ROOT_COORDINATOR, ROOT_COORDINATOR_IMPORT, render_coordinator_binding};
use crate::model::{AgentDefinition, BuiltinAction, EnabledPrimitives, PromptType, SynthesizedType};
use crate::modelmap::ResolvedModel;
use crate::prompts::{CompiledPrompt, render_prompts};
use crate::schema::render::render_declarations;
use crate::tools::ToolGroup;
use crate::tools::render::{render_helpers, render_tool};

/// Where a module loads its proxied tools from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayBinding {
    pub url: String,
    pub region: String,
    /// Prefix of the credential variables in the environment file.
    pub env_prefix: String,
}

/// Everything compiled for one agent, ready to be rendered.
#[derive(Debug, Clone)]
pub struct ModulePlan<'a> {
    pub agent: &'a AgentDefinition,
    pub module_name: String,
    pub model: ResolvedModel,
    pub is_root: bool,
    /// `invoke_agent` takes relayed turns from a parent.
    pub accepts_relay: bool,
    pub types: Vec<SynthesizedType>,
    /// Groups emitted as local tools.
    pub local_groups: Vec<ToolGroup>,
    pub gateway: Option<GatewayBinding>,
    pub prompts: Vec<CompiledPrompt>,
    pub memory: MemoryVariant,
    pub collaborators: Vec<CollaboratorLink>,
    pub primitives: EnabledPrimitives,
}

impl ModulePlan<'_> {
    /// This module or one of its collaborators owns a self-contained memory
    /// manager.
    pub fn binds_coordinator(&self) -> bool {
        self.memory.needs_coordinator() || self.collaborators.iter().any(|c| c.binds_coordinator)
    }

    fn has_prompt(&self, kind: PromptType) -> bool {
        self.prompts.iter().any(|p| p.kind == kind)
    }

    fn action_group_tools(&self) -> Vec<&str> {
        self.local_groups
            .iter()
            .flat_map(|g| g.tools.iter().map(|t| t.name.as_str()))
            .collect()
    }

    fn end_sessions(&self) -> Option<&'static str> {
        if self.is_root && self.binds_coordinator() {
            Some("session_coordinator.end_all_sessions()")
        } else if !self.is_root && self.memory.needs_coordinator() {
            Some("memory_manager.end_session()")
        } else {
            None
        }
    }
}

/// Names of the knowledge-base and built-in tools of `agent`, in the order
/// they are handed to the agent.
pub fn builtin_tools(backend: &dyn ProfileBackend, agent: &AgentDefinition) -> Vec<String> {
    let mut names: Vec<String> = agent
        .knowledge_bases
        .iter()
        .map(|kb| backend.knowledge_base_tool(kb, &agent.region).tool_name)
        .collect();
    if agent.has_builtin(BuiltinAction::UserInput) {
        names.push("user_input_tool".to_string());
    }
    if agent.has_builtin(BuiltinAction::CodeInterpreter) {
        names.push("code_tool".to_string());
    }
    names
}

pub fn render_module(backend: &dyn ProfileBackend, plan: &ModulePlan<'_>) -> String {
    let agent = plan.agent;
    let code_tool = agent.has_builtin(BuiltinAction::CodeInterpreter);
    let managed_interpreter = plan.primitives.code_interpreter;
    let coordinator_root = plan.is_root && plan.binds_coordinator();
    debug!(
        "assembling {} ({} prompts, {} local groups, {} collaborators)",
        plan.module_name,
        plan.prompts.len(),
        plan.local_groups.len(),
        plan.collaborators.len()
    );

    let mut imports: Vec<String> = vec![HEADER.to_string(), backend.imports().to_string()];
    if plan.gateway.is_some() {
        imports.push(format!("{GATEWAY_IMPORT}\n{}", backend.mcp_imports()));
    }
    if plan.memory.is_enabled() {
        imports.push(plan.memory.imports().to_string());
    }
    if coordinator_root {
        imports.push(ROOT_COORDINATOR_IMPORT.to_string());
    }
    if code_tool {
        imports.push(code_interpreter_import(managed_interpreter).to_string());
    }
    if !plan.collaborators.is_empty() {
        imports.push(
            plan.collaborators
                .iter()
                .map(CollaboratorLink::import_line)
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    let (observe_import, observe_setup) = backend.observability();
    if plan.primitives.observability {
        imports.push(observe_import.to_string());
    }
    let mut setup = vec!["load_dotenv()".to_string()];
    if plan.is_root {
        setup.push("app = BedrockAgentCoreApp()".to_string());
    }
    if plan.primitives.observability {
        setup.push(observe_setup.to_string());
    }
    imports.push(setup.join("\n"));

    let models = plan
        .prompts
        .iter()
        .map(|p| {
            backend.model(
                p.kind,
                &plan.model,
                &agent.region,
                &p.inference,
                agent.guardrail.as_ref(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut collaboration: Vec<String> = plan
        .collaborators
        .iter()
        .map(|link| backend.collaborator_tool(link))
        .collect();
    if agent.is_router() && !plan.collaborators.is_empty() {
        collaboration.push(render_routes(&plan.collaborators));
    }

    let mut tools: Vec<String> = vec![render_declarations(&plan.types)];
    let all_tools = plan.local_groups.iter().flat_map(|g| g.tools.iter());
    if all_tools.clone().any(|t| t.is_backed()) {
        tools.push(render_helpers(agent));
    }
    tools.extend(all_tools.map(|t| render_tool(t, "@tool")));
    if agent.has_builtin(BuiltinAction::UserInput) {
        tools.push(USER_INPUT_TOOL.to_string());
    }
    if code_tool {
        tools.push(render_code_interpreter(
            backend,
            managed_interpreter,
            &plan.model,
            &agent.region,
        ));
    }
    if let Some(gateway) = &plan.gateway {
        tools.push(render_client_setup(&gateway.region, &gateway.url, &gateway.env_prefix));
        tools.push(backend.mcp_client().to_string());
    }
    tools.push(format!("action_group_tools = [{}]", plan.action_group_tools().join(", ")));

    let mut memory: Vec<String> = vec![
        backend.short_term_memory().to_string(),
        plan.memory.render(backend.platform()),
    ];
    if plan.binds_coordinator() {
        let children: Vec<String> = plan
            .collaborators
            .iter()
            .filter(|c| c.binds_coordinator)
            .map(CollaboratorLink::bind_alias)
            .collect();
        memory.push(render_coordinator_binding(plan.memory.needs_coordinator(), &children));
    }
    if coordinator_root {
        memory.push(ROOT_COORDINATOR.to_string());
    }

    let knowledge_bases = agent
        .knowledge_bases
        .iter()
        .map(|kb| backend.knowledge_base_tool(kb, &agent.region).code)
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut agent_tools = builtin_tools(backend, agent);
    agent_tools.extend(plan.collaborators.iter().map(|c| c.tool_name.clone()));
    let mut setup: Vec<String> = vec![
        format!("tools = [{}]", agent_tools.join(", ")),
        "tools_used = set()".to_string(),
        "tools += action_group_tools".to_string(),
    ];
    if plan.gateway.is_some() {
        setup.push("tools += mcp_tools".to_string());
    }
    let driver = render_driver(
        backend,
        DriverOptions {
            memory: &plan.memory,
            is_router: agent.is_router() && !plan.collaborators.is_empty(),
            accepts_relay: plan.accepts_relay,
            pre_processing: plan.has_prompt(PromptType::PreProcessing),
            post_processing: plan.has_prompt(PromptType::PostProcessing),
        },
    );
    let agent_setup = [
        setup.join("\n"),
        driver,
        render_entrypoint(backend, &plan.memory, plan.is_root),
    ]
    .join("\n\n\n");

    ModuleSections {
        imports: imports.join("\n\n"),
        models,
        prompts: render_prompts(&plan.prompts),
        collaboration: collaboration.join("\n\n\n"),
        tools: tools.join("\n\n\n"),
        memory: memory.join("\n\n"),
        knowledge_bases,
        agent_setup,
        usage: render_usage(agent.idle_timeout_secs, plan.end_sessions(), plan.is_root),
    }
    .assemble()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionGroup, Collaborator, InferenceConfig, KnowledgeBase};
    use crate::profile::Profile;
    use crate::tools::{Operation, Tool, ToolBody, ToolInput};
    use serde_json::json;

    fn agent() -> AgentDefinition {
        AgentDefinition {
            name: "weather".into(),
            model_id: "anthropic.claude-3-haiku-20240307-v1:0".into(),
            region: "us-west-2".into(),
            idle_timeout_secs: 600,
            ..Default::default()
        }
    }

    fn weather_group() -> ToolGroup {
        ToolGroup {
            action_group: "WeatherAction".into(),
            namespace: "weatheraction".into(),
            function_ref: Some("arn:aws:lambda:us-west-2:1:function:w".into()),
            tools: vec![Tool {
                name: "weatheraction_weather_get".into(),
                description: "Get the weather. Action group: WeatherAction".into(),
                action_group: "WeatherAction".into(),
                input: ToolInput::None,
                body: ToolBody::Invoke {
                    function_ref: "arn:aws:lambda:us-west-2:1:function:w".into(),
                    region: "us-west-2".into(),
                },
                operation: Operation::OpenApi {
                    path: "/weather".into(),
                    method: "GET".into(),
                    has_parameters: false,
                    default_media_type: None,
                },
                input_schema: json!({"type": "object"}),
            }],
        }
    }

    fn plan<'a>(agent: &'a AgentDefinition) -> ModulePlan<'a> {
        ModulePlan {
            agent,
            module_name: "langchain_weather".into(),
            model: ResolvedModel {
                model_id: agent.model_id.clone(),
                provider: "anthropic".into(),
            },
            is_root: true,
            accepts_relay: false,
            types: Vec::new(),
            local_groups: vec![weather_group()],
            gateway: None,
            prompts: vec![CompiledPrompt {
                kind: PromptType::Orchestration,
                template: "Be helpful.".into(),
                inference: InferenceConfig::default(),
            }],
            memory: MemoryVariant::Disabled,
            collaborators: Vec::new(),
            primitives: EnabledPrimitives::default(),
        }
    }

    #[test]
    fn sections_follow_the_module_layout() {
        let agent = agent();
        let code = render_module(Profile::Langgraph.backend(), &plan(&agent));
        let order = [
            "import json, sys",
            "llm_ORCHESTRATION = ChatBedrock(",
            "ORCHESTRATION_TEMPLATE = \"\"\"",
            "def weatheraction_weather_get(",
            "action_group_tools = [weatheraction_weather_get]",
            "checkpointer_STM = InMemorySaver()",
            "tools = []",
            "def get_agent():",
            "@app.entrypoint",
            "def cli():",
            "if __name__ == \"__main__\":",
        ];
        let mut last = 0;
        for marker in order {
            let at = code[last..].find(marker).unwrap_or_else(|| panic!("missing {marker}")) + last;
            last = at;
        }
        assert!(code.contains("app = BedrockAgentCoreApp()"));
        assert!(!code.contains("GatewayClient"));
        assert!(!code.contains("{{"));
        assert!(code.ends_with("app.run()\n"));
    }

    #[test]
    fn gateway_modules_load_remote_tools() {
        let agent = agent();
        let mut plan = plan(&agent);
        plan.local_groups.clear();
        plan.gateway = Some(GatewayBinding {
            url: "https://gw.example/mcp".into(),
            region: "us-west-2".into(),
            env_prefix: String::new(),
        });
        let code = render_module(Profile::Strands.backend(), &plan);
        assert!(code.contains(GATEWAY_IMPORT));
        assert!(code.contains("from strands.tools.mcp.mcp_client import MCPClient"));
        assert!(code.contains("os.environ.get(\"cognito_client_id\", \"\")"));
        assert!(code.contains("action_group_tools = []"));
        assert!(code.contains("tools += mcp_tools"));
        assert!(!code.contains("def _dump_input"));
    }

    #[test]
    fn root_with_memory_in_a_collaborator_creates_the_coordinator() {
        let mut agent = agent();
        agent.knowledge_bases = vec![KnowledgeBase {
            name: "docs".into(),
            description: "Docs".into(),
            id: "KB1".into(),
            region: None,
        }];
        agent.action_groups = vec![ActionGroup {
            name: "UserInputAction".into(),
            enabled: true,
            builtin: Some(BuiltinAction::UserInput),
            ..Default::default()
        }];
        let collaborator = Collaborator {
            name: "billing".into(),
            instruction: "Billing".into(),
            relay_history: false,
            agent: AgentDefinition::default(),
        };
        let mut plan = plan(&agent);
        plan.local_groups.clear();
        plan.collaborators = vec![CollaboratorLink::new(
            &collaborator,
            "langchain_collaborator_billing".into(),
            true,
        )];
        let code = render_module(Profile::Langgraph.backend(), &plan);
        assert!(code.contains(ROOT_COORDINATOR_IMPORT));
        assert!(code.contains("def bind_session_coordinator(coordinator):\n    bind_billing_session_coordinator(coordinator)"));
        assert!(code.contains("session_coordinator = SessionCoordinator()"));
        assert!(code.contains("tools = [retriever_tool_docs, user_input_tool, invoke_billing]"));
        assert!(code.contains("    finally:\n        session_coordinator.end_all_sessions()"));
    }

    #[test]
    fn collaborator_modules_accept_relay_and_skip_the_app() {
        let mut agent = agent();
        agent.memory = Some(crate::model::MemoryConfig {
            enabled_memory_types: vec!["SESSION_SUMMARY".into()],
            storage_days: 30,
            max_recent_sessions: 20,
        });
        let mut plan = plan(&agent);
        plan.is_root = false;
        plan.accepts_relay = true;
        plan.module_name = "strands_collaborator_weather".into();
        plan.memory = MemoryVariant::self_contained(&agent, &plan.module_name);
        let code = render_module(Profile::Strands.backend(), &plan);
        assert!(!code.contains("app = BedrockAgentCoreApp()"));
        assert!(!code.contains("@app.entrypoint"));
        assert!(code.contains("def invoke_agent(question: str, relayed_messages=None):"));
        assert!(code.contains("def bind_session_coordinator(coordinator):\n    coordinator.register(memory_manager)"));
        assert!(!code.contains("session_coordinator = SessionCoordinator()"));
        assert!(code.contains("    finally:\n        memory_manager.end_session()"));
        assert!(code.ends_with("if __name__ == \"__main__\":\n    cli()\n"));
    }

    #[test]
    fn builtin_tools_follow_knowledge_bases() {
        let mut agent = agent();
        agent.action_groups = vec![ActionGroup {
            name: "CodeInterpreterAction".into(),
            enabled: true,
            builtin: Some(BuiltinAction::CodeInterpreter),
            ..Default::default()
        }];
        assert_eq!(builtin_tools(Profile::Strands.backend(), &agent), vec!["code_tool"]);
    }
}
