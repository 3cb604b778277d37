//! Collaborator wiring in a parent module: imports of the sub-agent modules,
//! wrapper-tool descriptions, routing catalogs and router dispatch.

use serde_json::{Value as JsonValue, json};

use crate::emit::format::fill;
use crate::emit::python::{bool_literal, literal, string_literal};
use crate::model::{AgentDefinition, Collaborator, clean_variable_name};
use crate::prompts::DefinitionValues;

/// A compiled collaborator as seen from its parent module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorLink {
    /// Name the router classifier answers with.
    pub name: String,
    /// Wrapper tool exposed to the parent's model.
    pub tool_name: String,
    /// Python module the sub-agent was emitted as.
    pub module: String,
    pub relay: bool,
    pub agent_name: String,
    pub instruction: String,
    /// The sub-agent's subtree holds a self-contained memory manager.
    pub binds_coordinator: bool,
}

impl CollaboratorLink {
    pub fn new(collaborator: &Collaborator, module: String, binds_coordinator: bool) -> Self {
        let clean = clean_variable_name(&collaborator.name);
        Self {
            name: clean.clone(),
            tool_name: format!("invoke_{clean}"),
            module,
            relay: collaborator.relay_history,
            agent_name: collaborator.agent.name.clone(),
            instruction: collaborator.instruction.clone(),
            binds_coordinator,
        }
    }

    /// Local alias of the sub-agent's `invoke_agent`.
    pub fn invoke_alias(&self) -> String {
        format!("{}_collaborator", self.tool_name)
    }

    /// Local alias of the sub-agent's `bind_session_coordinator`.
    pub fn bind_alias(&self) -> String {
        format!("bind_{}_session_coordinator", self.name)
    }

    pub fn import_line(&self) -> String {
        if self.binds_coordinator {
            format!(
                "from {} import invoke_agent as {}, bind_session_coordinator as {}",
                self.module,
                self.invoke_alias(),
                self.bind_alias()
            )
        } else {
            format!("from {} import invoke_agent as {}", self.module, self.invoke_alias())
        }
    }

    /// Catalog entry naming the agent, its wrapper tool and instruction.
    pub fn catalog_entry(&self) -> String {
        literal(&json!({
            "agentName": self.agent_name,
            "collaboratorName (for invocation)": self.tool_name,
            "collaboratorInstruction": self.instruction,
        }))
    }

    /// Docstring of the wrapper tool.
    pub fn tool_description(&self) -> String {
        format!(
            "Invoke the collaborator agent/specialist with the following description: {}",
            self.catalog_entry()
        )
    }
}

fn catalog(links: &[CollaboratorLink]) -> String {
    links
        .iter()
        .map(CollaboratorLink::catalog_entry)
        .collect::<Vec<_>>()
        .join(",")
}

/// Definition-phase placeholder values for `agent`. `tool_names` are the
/// local tools the agent's model can call besides its collaborators.
pub fn definition_values(
    agent: &AgentDefinition,
    links: &[CollaboratorLink],
    tool_names: &[String],
) -> DefinitionValues {
    let knowledge_bases: Vec<JsonValue> = agent
        .knowledge_bases
        .iter()
        .map(|kb| json!({"name": kb.name, "description": kb.description}))
        .collect();
    let tools: Vec<JsonValue> = tool_names.iter().map(|t| json!(t)).collect();
    DefinitionValues {
        instruction: agent.instruction.clone(),
        agent_collaborators: catalog(links),
        reachable_agents: catalog(links),
        tools_for_routing: literal(&JsonValue::Array(tools)),
        knowledge_bases_for_routing: literal(&JsonValue::Array(knowledge_bases)),
    }
}

/// Routing table of a router module: collaborator name to its invoke alias
/// and relay policy.
pub fn render_routes(links: &[CollaboratorLink]) -> String {
    let entries = links
        .iter()
        .map(|link| {
            format!(
                "    {}: ({}, {}),",
                string_literal(&link.name),
                link.invoke_alias(),
                bool_literal(link.relay)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("collaborator_routes = {{\n{entries}\n}}")
}

const ROUTER_DISPATCH: &str = r#"routing_template = ROUTING_TEMPLATE.replace("$last_user_request$", question).replace("$conversation$", messages).replace("$last_most_specialized_agent$", last_agent)
{{classify}}
choice = str(re.findall(r"<a.*?>(.*?)</a>", routing_choice)[0]).strip().removeprefix("invoke_")
if choice == "keep_previous_agent":
    choice = last_agent
if choice in collaborator_routes:
    last_agent = choice
    target, relay = collaborator_routes[choice]
    return target(question, {{history}}) if relay else target(question)"#;

/// Classification and branch of a router's `invoke_agent`. `messages` must
/// hold the serialized conversation; `classify` assigns `routing_choice`;
/// `history` is the relayed turns expression.
pub fn render_router_dispatch(classify: &str, history: &str) -> String {
    fill(ROUTER_DISPATCH, &[("classify", classify), ("history", history)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KnowledgeBase;

    fn link(name: &str, relay: bool, binds: bool) -> CollaboratorLink {
        let collaborator = Collaborator {
            name: name.into(),
            instruction: format!("Handles {name} questions"),
            relay_history: relay,
            agent: AgentDefinition {
                name: format!("{name}-agent"),
                ..Default::default()
            },
        };
        CollaboratorLink::new(&collaborator, format!("strands_collaborator_{name}"), binds)
    }

    #[test]
    fn links_alias_the_sub_agent_entrypoints() {
        let plain = link("billing", false, false);
        assert_eq!(plain.tool_name, "invoke_billing");
        assert_eq!(
            plain.import_line(),
            "from strands_collaborator_billing import invoke_agent as invoke_billing_collaborator"
        );
        let bound = link("billing", false, true);
        assert!(bound.import_line().ends_with(
            ", bind_session_coordinator as bind_billing_session_coordinator"
        ));
    }

    #[test]
    fn descriptions_embed_the_collaboration_instruction() {
        let desc = link("billing", false, false).tool_description();
        assert!(desc.starts_with("Invoke the collaborator agent/specialist with the following description: {"));
        assert!(desc.contains("\"collaboratorName (for invocation)\": \"invoke_billing\""));
        assert!(desc.contains("\"collaboratorInstruction\": \"Handles billing questions\""));
    }

    #[test]
    fn routing_catalogs_list_collaborators_tools_and_knowledge_bases() {
        let agent = AgentDefinition {
            instruction: "Route well.".into(),
            knowledge_bases: vec![KnowledgeBase {
                name: "docs".into(),
                description: "Product docs".into(),
                id: "KB1".into(),
                region: None,
            }],
            ..Default::default()
        };
        let links = vec![link("billing", false, false), link("support", true, false)];
        let values = definition_values(&agent, &links, &["orders_lookup".into()]);
        assert_eq!(values.instruction, "Route well.");
        assert_eq!(values.reachable_agents, values.agent_collaborators);
        assert_eq!(values.reachable_agents.matches("agentName").count(), 2);
        assert_eq!(values.tools_for_routing, "[\"orders_lookup\"]");
        assert_eq!(
            values.knowledge_bases_for_routing,
            "[{\"name\": \"docs\", \"description\": \"Product docs\"}]"
        );
    }

    #[test]
    fn routes_cover_every_collaborator() {
        let links = vec![link("billing", false, false), link("support", true, false)];
        let routes = render_routes(&links);
        assert_eq!(
            routes,
            "collaborator_routes = {\n    \"billing\": (invoke_billing_collaborator, False),\n    \"support\": (invoke_support_collaborator, True),\n}"
        );
        let dispatch = render_router_dispatch("routing_choice = classify()", "history");
        assert!(dispatch.contains("routing_choice = classify()\nchoice = "));
        assert!(dispatch.contains("return target(question, history) if relay else target(question)"));
        assert!(!dispatch.contains("eval("));
    }
}
