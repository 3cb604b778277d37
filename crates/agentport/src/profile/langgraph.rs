//! Profile A: LangGraph react agents with an in-memory checkpointer.

use super::{InvokeParts, KnowledgeBaseTool, ProfileBackend};
use crate::collab::CollaboratorLink;
use crate::emit::format::fill;
use crate::emit::python::{float_literal, literal, string_list, string_literal, triple_quoted};
use crate::model::{GuardrailRef, InferenceConfig, KnowledgeBase, PromptType, clean_variable_name};
use crate::modelmap::ResolvedModel;

pub struct LanggraphBackend;

const IMPORTS: &str = r#"sys.path.append(os.path.dirname(os.path.abspath(__file__)))

from langchain_aws import ChatBedrock
from langchain_aws.retrievers import AmazonKnowledgeBasesRetriever
from langchain_core.messages import HumanMessage, SystemMessage, AIMessage, ToolMessage
from langchain.tools import tool
from langgraph.prebuilt import create_react_agent, InjectedState
from langgraph.checkpoint.memory import InMemorySaver"#;

const MODEL: &str = r#"llm_{{kind}} = ChatBedrock(
    model_id={{model_id}},
    region_name={{region}},
    provider={{provider}},
    model_kwargs={
{{kwargs}}
    },{{guardrails}}
)"#;

const KNOWLEDGE_BASE: &str = r#"retriever_{{name}} = AmazonKnowledgeBasesRetriever(
    knowledge_base_id={{id}},
    retrieval_config={"vectorSearchConfiguration": {"numberOfResults": 5}},
    region_name={{region}},
)
retriever_tool_{{name}} = retriever_{{name}}.as_tool(
    name={{tool_name}},
    description={{description}},
)"#;

const COLLABORATOR: &str = r#"@tool
def {{tool_name}}(query: str, state: Annotated[dict, InjectedState]) -> str:
    {{docstring}}
{{relay}}    invoke_agent_response = {{invoke}}(query{{relay_arg}})
    tools_used.update([msg.name for msg in invoke_agent_response if isinstance(msg, ToolMessage)])
    return invoke_agent_response[-1].content"#;

const MCP_CLIENT: &str = r#"mcp_client = MultiServerMCPClient({
    "agent": {
        "transport": "streamable_http",
        "url": mcp_url,
        "headers": headers,
    }
})
mcp_tools = asyncio.run(mcp_client.get_tools())"#;

const CODING_AGENT: &str = r#"coding_agent = create_react_agent(model=llm_ORCHESTRATION, prompt=CODING_PROMPT, tools=coding_tools)
coding_agent_input = {"messages": [{"role": "user", "content": original_question}]}
return coding_agent.invoke(coding_agent_input)["messages"][-1].content"#;

const HELPERS: &str = r#"config = {"configurable": {"thread_id": "1"}}"#;

const BUILD_AGENT: &str = r#"_agent = create_react_agent(
    model=llm_ORCHESTRATION,
    prompt=system_prompt,
    tools=tools,
    checkpointer=checkpointer_STM,
)"#;

const PARTS: InvokeParts = InvokeParts {
    relay: r#"agent.update_state(config, {"messages": relayed_messages})"#,
    conversation: r#"conversation = agent.checkpointer.get(config) or {}
messages = str(conversation.get("channel_values", {}).get("messages", []))"#,
    history: r#"conversation.get("channel_values", {}).get("messages", [])"#,
    classify: "routing_choice = llm_ROUTING_CLASSIFIER.invoke([SystemMessage(routing_template), HumanMessage(question)]).content",
    pre_process: "pre_process_output = llm_PRE_PROCESSING.invoke([SystemMessage(PRE_PROCESSING_TEMPLATE), HumanMessage(question)]).content",
    run: r#"response = asyncio.run(agent.ainvoke({"messages": [{"role": "user", "content": question}]}, config))"#,
    latest_response: r#"response["messages"][-1].content"#,
    responses: r#"str(response["messages"])"#,
    post_process: r#"post_process_output = llm_POST_PROCESSING.invoke([HumanMessage(post_process_prompt)])
return [AIMessage(post_process_output.content)]"#,
    plain_return: r#"return response["messages"]"#,
};

impl ProfileBackend for LanggraphBackend {
    fn platform(&self) -> &'static str {
        "langchain"
    }

    fn requirements(&self) -> &'static str {
        include_str!("../../assets/requirements_langgraph.txt")
    }

    fn imports(&self) -> &'static str {
        IMPORTS
    }

    fn mcp_imports(&self) -> &'static str {
        "from langchain_mcp_adapters.client import MultiServerMCPClient"
    }

    fn observability(&self) -> (&'static str, &'static str) {
        (
            "from opentelemetry.instrumentation.langchain import LangchainInstrumentor",
            "LangchainInstrumentor().instrument()",
        )
    }

    fn model(
        &self,
        kind: PromptType,
        model: &ResolvedModel,
        region: &str,
        inference: &InferenceConfig,
        guardrail: Option<&GuardrailRef>,
    ) -> String {
        let mut kwargs: Vec<String> = Vec::new();
        if model.supports_sampling_extras() {
            kwargs.push(format!("        \"top_k\": {},", inference.top_k));
        }
        kwargs.push(format!("        \"top_p\": {},", float_literal(inference.top_p)));
        kwargs.push(format!(
            "        \"temperature\": {},",
            float_literal(inference.temperature)
        ));
        kwargs.push(format!("        \"max_tokens\": {},", inference.maximum_length));
        if model.supports_sampling_extras() {
            kwargs.push(format!(
                "        \"stop_sequences\": {},",
                string_list(&inference.stop_sequences)
            ));
        }
        let guardrails = guardrail
            .map(|g| {
                format!(
                    "\n    guardrails={},",
                    literal(&serde_json::json!({
                        "guardrailIdentifier": g.id,
                        "guardrailVersion": g.version,
                    }))
                )
            })
            .unwrap_or_default();
        fill(
            MODEL,
            &[
                ("kind", kind.as_str()),
                ("model_id", &string_literal(&model.model_id)),
                ("region", &string_literal(region)),
                ("provider", &string_literal(&model.provider)),
                ("kwargs", &kwargs.join("\n")),
                ("guardrails", &guardrails),
            ],
        )
    }

    fn knowledge_base_tool(&self, kb: &KnowledgeBase, region: &str) -> KnowledgeBaseTool {
        let name = clean_variable_name(&kb.name);
        let description = format!(
            "This is a knowledge base with the following description: {}. Invoke it with a query to get relevant results.",
            kb.description
        );
        let code = fill(
            KNOWLEDGE_BASE,
            &[
                ("name", &name),
                ("id", &string_literal(&kb.id)),
                ("region", &string_literal(kb.region.as_deref().unwrap_or(region))),
                ("tool_name", &string_literal(&format!("kb_{name}"))),
                ("description", &string_literal(&description)),
            ],
        );
        KnowledgeBaseTool {
            tool_name: format!("retriever_tool_{name}"),
            code,
        }
    }

    fn collaborator_tool(&self, link: &CollaboratorLink) -> String {
        let (relay, relay_arg) = if link.relay {
            (
                "    relay_history = state.get(\"messages\", [])[:-1]\n",
                ", relay_history",
            )
        } else {
            ("", "")
        };
        fill(
            COLLABORATOR,
            &[
                ("tool_name", &link.tool_name),
                ("docstring", &triple_quoted(&link.tool_description())),
                ("relay", relay),
                ("invoke", &link.invoke_alias()),
                ("relay_arg", relay_arg),
            ],
        )
    }

    fn mcp_client(&self) -> &'static str {
        MCP_CLIENT
    }

    fn short_term_memory(&self) -> &'static str {
        "checkpointer_STM = InMemorySaver()"
    }

    fn coding_agent(&self) -> &'static str {
        CODING_AGENT
    }

    fn agent_helpers(&self) -> &'static str {
        HELPERS
    }

    fn build_agent(&self) -> &'static str {
        BUILD_AGENT
    }

    fn invoke_parts(&self) -> InvokeParts {
        PARTS
    }

    fn tools_used_update(&self) -> &'static str {
        "tools_used.update([msg.name for msg in agent_result if isinstance(msg, ToolMessage)])"
    }

    fn response_content(&self) -> &'static str {
        "agent_result[-1].content"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentDefinition, Collaborator};

    fn resolved(provider: &str) -> ResolvedModel {
        ResolvedModel {
            model_id: "anthropic.claude-3-haiku-20240307-v1:0".into(),
            provider: provider.into(),
        }
    }

    #[test]
    fn anthropic_models_carry_sampling_extras_and_guardrails() {
        let guardrail = GuardrailRef {
            id: "gr-1".into(),
            version: "2".into(),
        };
        let code = LanggraphBackend.model(
            PromptType::Orchestration,
            &resolved("anthropic"),
            "us-west-2",
            &InferenceConfig::default(),
            Some(&guardrail),
        );
        assert!(code.starts_with("llm_ORCHESTRATION = ChatBedrock(\n    model_id=\"anthropic.claude-3-haiku-20240307-v1:0\",\n"));
        assert!(code.contains("        \"top_k\": 250,\n        \"top_p\": 1.0,\n        \"temperature\": 0.0,\n        \"max_tokens\": 2048,\n        \"stop_sequences\": [],"));
        assert!(code.contains("guardrails={\"guardrailIdentifier\": \"gr-1\", \"guardrailVersion\": \"2\"},"));
        assert!(code.ends_with("\n)"));
    }

    #[test]
    fn other_providers_skip_top_k() {
        let code = LanggraphBackend.model(
            PromptType::PreProcessing,
            &resolved("meta"),
            "us-west-2",
            &InferenceConfig::default(),
            None,
        );
        assert!(code.starts_with("llm_PRE_PROCESSING = ChatBedrock("));
        assert!(!code.contains("top_k"));
        assert!(!code.contains("stop_sequences"));
        assert!(!code.contains("guardrails"));
    }

    #[test]
    fn knowledge_bases_become_retriever_tools() {
        let kb = KnowledgeBase {
            name: "Product Docs".into(),
            description: "Manuals".into(),
            id: "KB1".into(),
            region: None,
        };
        let tool = LanggraphBackend.knowledge_base_tool(&kb, "eu-west-1");
        assert_eq!(tool.tool_name, "retriever_tool_product_docs");
        assert!(tool.code.contains("knowledge_base_id=\"KB1\""));
        assert!(tool.code.contains("region_name=\"eu-west-1\""));
        assert!(tool.code.contains("name=\"kb_product_docs\""));
    }

    #[test]
    fn relaying_collaborators_forward_prior_turns() {
        let collaborator = Collaborator {
            name: "billing".into(),
            instruction: "Billing".into(),
            relay_history: true,
            agent: AgentDefinition::default(),
        };
        let link = CollaboratorLink::new(&collaborator, "langchain_collaborator_billing".into(), false);
        let code = LanggraphBackend.collaborator_tool(&link);
        assert!(code.starts_with("@tool\ndef invoke_billing(query: str, state: Annotated[dict, InjectedState]) -> str:\n"));
        assert!(code.contains("    relay_history = state.get(\"messages\", [])[:-1]\n    invoke_agent_response = invoke_billing_collaborator(query, relay_history)"));
    }
}
