//! Profile B: Strands agents with a sliding-window conversation manager.

use super::{InvokeParts, KnowledgeBaseTool, ProfileBackend};
use crate::collab::CollaboratorLink;
use crate::emit::format::fill;
use crate::emit::python::{float_literal, string_list, string_literal, triple_quoted};
use crate::model::{GuardrailRef, InferenceConfig, KnowledgeBase, PromptType, clean_variable_name};
use crate::modelmap::ResolvedModel;

pub struct StrandsBackend;

const IMPORTS: &str = r#"sys.path.append(os.path.dirname(os.path.abspath(__file__)))

from strands import Agent, tool
from strands.agent.conversation_manager import SlidingWindowConversationManager
from strands.models import BedrockModel"#;

const MCP_IMPORTS: &str = r#"from mcp.client.streamable_http import streamablehttp_client
from strands.tools.mcp.mcp_client import MCPClient
from concurrent.futures import ThreadPoolExecutor, TimeoutError as FutureTimeoutError"#;

// Guardrails are not attached: converse models apply them to every turn of
// the loop, including tool results.
const MODEL: &str = r#"llm_{{kind}} = BedrockModel(
    model_id={{model_id}},
    region_name={{region}},
    temperature={{temperature}},
    max_tokens={{max_tokens}},
    stop_sequences={{stop_sequences}},
    top_p={{top_p}},
    top_k={{top_k}},
)"#;

const KNOWLEDGE_BASE: &str = r#"@tool
def retrieve_{{name}}(query: str):
    {{docstring}}
    client = boto3.client("bedrock-agent-runtime", region_name={{region}})
    return client.retrieve(
        retrievalQuery={"text": query},
        knowledgeBaseId={{id}},
        retrievalConfiguration={
            "vectorSearchConfiguration": {"numberOfResults": 10},
        },
    ).get("retrievalResults", [])"#;

const COLLABORATOR: &str = r#"@tool
def {{tool_name}}(query: str) -> str:
    {{docstring}}
{{relay}}    invoke_agent_response = {{invoke}}(query{{relay_arg}})
    return str(invoke_agent_response)"#;

const MCP_CLIENT: &str = r#"streamable_http_mcp_client = MCPClient(lambda: streamablehttp_client(mcp_url, headers=headers))


def init_mcp():
    streamable_http_mcp_client.start()
    return streamable_http_mcp_client.list_tools_sync()


try:
    with ThreadPoolExecutor() as executor:
        mcp_tools = executor.submit(init_mcp).result(timeout=10)
except (FutureTimeoutError, Exception):
    mcp_tools = []"#;

const CODING_AGENT: &str = r#"coding_agent = Agent(model=llm_ORCHESTRATION, system_prompt=CODING_PROMPT, tools=coding_tools)
return str(coding_agent(original_question))"#;

const HELPERS: &str = r#"def make_msg(role, text):
    return {"role": role, "content": [{"text": text}]}


def inference(model, messages, system_prompt=""):
    async def run_inference():
        results = []
        async for event in model.stream(messages=messages, system_prompt=system_prompt):
            results.append(event)
        return results

    text = ""
    for chunk in asyncio.run(run_inference()):
        if "contentBlockDelta" in chunk:
            text += chunk["contentBlockDelta"].get("delta", {}).get("text", "")
    return text"#;

const BUILD_AGENT: &str = r#"_agent = Agent(
    model=llm_ORCHESTRATION,
    system_prompt=system_prompt,
    tools=tools,
    conversation_manager=checkpointer_STM,
)"#;

const PARTS: InvokeParts = InvokeParts {
    relay: "agent.messages = relayed_messages",
    conversation: "messages = str(agent.messages)",
    history: "agent.messages",
    classify: r#"routing_choice = inference(llm_ROUTING_CLASSIFIER, [make_msg("user", question)], system_prompt=routing_template)"#,
    pre_process: r#"pre_process_output = inference(llm_PRE_PROCESSING, [make_msg("user", question)], system_prompt=PRE_PROCESSING_TEMPLATE)"#,
    run: r#"original_stdout = sys.stdout
sys.stdout = io.StringIO()
try:
    response = agent(question)
finally:
    sys.stdout = original_stdout"#,
    latest_response: "str(response)",
    responses: "str(agent.messages)",
    post_process: r#"return inference(llm_POST_PROCESSING, [make_msg("user", post_process_prompt)])"#,
    plain_return: "return response",
};

impl ProfileBackend for StrandsBackend {
    fn platform(&self) -> &'static str {
        "strands"
    }

    fn requirements(&self) -> &'static str {
        include_str!("../../assets/requirements_strands.txt")
    }

    fn imports(&self) -> &'static str {
        IMPORTS
    }

    fn mcp_imports(&self) -> &'static str {
        MCP_IMPORTS
    }

    fn observability(&self) -> (&'static str, &'static str) {
        (
            "from strands.telemetry import StrandsTelemetry",
            "strands_telemetry = StrandsTelemetry()\nstrands_telemetry.setup_meter(enable_console_exporter=True)\nstrands_telemetry.setup_console_exporter()",
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
        if let Some(g) = guardrail {
            tracing::debug!("guardrail '{}' not attached to {} model", g.id, kind.as_str());
        }
        fill(
            MODEL,
            &[
                ("kind", kind.as_str()),
                ("model_id", &string_literal(&model.model_id)),
                ("region", &string_literal(region)),
                ("temperature", &float_literal(inference.temperature)),
                ("max_tokens", &inference.maximum_length.to_string()),
                ("stop_sequences", &string_list(&inference.stop_sequences)),
                ("top_p", &float_literal(inference.top_p)),
                ("top_k", &inference.top_k.to_string()),
            ],
        )
    }

    fn knowledge_base_tool(&self, kb: &KnowledgeBase, region: &str) -> KnowledgeBaseTool {
        let name = clean_variable_name(&kb.name);
        let docstring = triple_quoted(&format!(
            "This is a knowledge base with the following description: {}. Invoke it with a query to get relevant results.",
            kb.description
        ));
        let code = fill(
            KNOWLEDGE_BASE,
            &[
                ("name", &name),
                ("docstring", &docstring),
                ("region", &string_literal(kb.region.as_deref().unwrap_or(region))),
                ("id", &string_literal(&kb.id)),
            ],
        );
        KnowledgeBaseTool {
            tool_name: format!("retrieve_{name}"),
            code,
        }
    }

    fn collaborator_tool(&self, link: &CollaboratorLink) -> String {
        let (relay, relay_arg) = if link.relay {
            ("    relay_history = get_agent().messages[:-2]\n", ", relay_history")
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
        "checkpointer_STM = SlidingWindowConversationManager()"
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
        "if hasattr(agent_result, \"metrics\"):\n    tools_used.update(list(agent_result.metrics.tool_metrics.keys()))"
    }

    fn response_content(&self) -> &'static str {
        "str(agent_result)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentDefinition, Collaborator};

    #[test]
    fn models_pass_sampling_settings_directly() {
        let model = ResolvedModel {
            model_id: "amazon.nova-pro-v1:0".into(),
            provider: "amazon".into(),
        };
        let inference = InferenceConfig {
            temperature: 0.5,
            stop_sequences: vec!["</answer>".into()],
            ..Default::default()
        };
        let code = StrandsBackend.model(PromptType::Orchestration, &model, "us-east-1", &inference, None);
        assert_eq!(
            code,
            "llm_ORCHESTRATION = BedrockModel(\n    model_id=\"amazon.nova-pro-v1:0\",\n    region_name=\"us-east-1\",\n    temperature=0.5,\n    max_tokens=2048,\n    stop_sequences=[\"</answer>\"],\n    top_p=1.0,\n    top_k=250,\n)"
        );
    }

    #[test]
    fn knowledge_bases_retrieve_through_the_runtime_client() {
        let kb = KnowledgeBase {
            name: "docs".into(),
            description: "Manuals".into(),
            id: "KB1".into(),
            region: Some("eu-central-1".into()),
        };
        let tool = StrandsBackend.knowledge_base_tool(&kb, "us-west-2");
        assert_eq!(tool.tool_name, "retrieve_docs");
        assert!(tool.code.starts_with("@tool\ndef retrieve_docs(query: str):\n"));
        assert!(tool.code.contains("region_name=\"eu-central-1\""));
        assert!(tool.code.contains("\"numberOfResults\": 10"));
    }

    #[test]
    fn collaborators_without_relay_take_only_the_query() {
        let collaborator = Collaborator {
            name: "support".into(),
            instruction: "Support".into(),
            relay_history: false,
            agent: AgentDefinition::default(),
        };
        let link = CollaboratorLink::new(&collaborator, "strands_collaborator_support".into(), false);
        let code = StrandsBackend.collaborator_tool(&link);
        assert!(code.contains("def invoke_support(query: str) -> str:"));
        assert!(code.contains("invoke_agent_response = invoke_support_collaborator(query)\n"));
        assert!(!code.contains("relay_history"));
    }
}
