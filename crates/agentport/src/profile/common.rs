//! Source shared by both profiles: module header, built-in tools, the agent
//! driver, entrypoint and command-line loop.

use super::ProfileBackend;
use crate::collab::render_router_dispatch;
use crate::emit::format::{fill, indent};
use crate::emit::python::string_literal;
use crate::memory::MemoryVariant;
use crate::modelmap::ResolvedModel;

pub const HEADER: &str = r#"import json, sys, os, re, io, uuid, asyncio
from typing import Union, Optional, Annotated, Dict, List, Any, Literal
from inputimeout import inputimeout, TimeoutOccurred
from pydantic import BaseModel, Field
import boto3
from dotenv import load_dotenv
from bedrock_agentcore.runtime.context import RequestContext
from bedrock_agentcore import BedrockAgentCoreApp"#;

pub const GATEWAY_IMPORT: &str = "from bedrock_agentcore_starter_toolkit.operations.gateway import GatewayClient";

pub const USER_INPUT_TOOL: &str = r#"@tool
def user_input_tool(user_targeted_question: str) -> str:
    """Ask the human for guidance when you are stuck or unsure what to do next. The input is a question for the human. When you lack the parameters needed to invoke a function, use this tool to ask the user for them."""
    return input(user_targeted_question)"#;

const CODE_TOOL_DOC: &str = r#"    """
    INPUT: The original question asked by the user.
    OUTPUT: The output of the code interpreter.
    CAPABILITIES: writing and running code for calculations, data processing and tasks that benefit from code.

    Do not pass code to this tool. Pass the coding task in the form of the original question you got from the user;
    the tool writes, runs, tests and troubleshoots the code itself.
    Do not ask it to run long tasks such as waiting for user input or running indefinitely.
    """"#;

const LOCAL_INTERPRETER: &str = r#"interpreter.llm.model = {{model}}
interpreter.llm.supports_functions = True
interpreter.llm.supports_vision = True
interpreter.computer.emit_images = True
interpreter.auto_run = True
interpreter.messages = []
interpreter.anonymized_telemetry = False
interpreter.system_message = "USER NOTES: Do not ask the user any questions and do not write code that awaits user input. Output the code you wrote so the calling agent can use it as part of a larger answer.\n" + interpreter.system_message


@tool
def code_tool(original_question: str) -> str:
{{doc}}
    return str(interpreter.chat(original_question, display=False))"#;

const MANAGED_INTERPRETER: &str = r#"CODING_PROMPT = """
You are a code interpreter that executes code to answer a query describing a coding task or question.
Write the code, run it in the sandbox, and handle errors you encounter.
Always answer with the actual result, including any output the code produced.
Never run code that waits for user input or runs indefinitely.
"""


def _sandbox_result(response):
    for event in response.get("stream", []):
        if "result" in event:
            result = event["result"]
            if result.get("isError", False):
                return {"error": True, "message": result.get("content", "Unknown error")}
            return {"success": True, "content": result.get("content", {})}
    return {"error": True, "message": "No result found in event stream"}


@tool
def code_tool(original_question: str) -> str:
{{doc}}
    with code_interpreter_client.code_session(region={{region}}) as session:

        @tool
        def execute_code(code: str, language: str):
            """Execute a complete code snippet in the sandbox. language names the programming language, e.g. python."""
            return _sandbox_result(session.invoke(method="executeCode", params={"code": code, "language": language}))

        @tool
        def list_files(path: str):
            """List files under a sandbox directory."""
            return _sandbox_result(session.invoke(method="listFiles", params={"path": path or "/"}))

        @tool
        def read_files(file_paths: List[str]):
            """Read files from the sandbox."""
            return _sandbox_result(session.invoke(method="readFiles", params={"paths": file_paths}))

        @tool
        def write_files(files_to_create: List[Dict[str, str]]):
            """Write files to the sandbox. Each entry has a 'path' and a 'text' key."""
            return _sandbox_result(session.invoke(method="writeFiles", params={"content": files_to_create}))

        @tool
        def remove_files(file_paths: List[str]):
            """Remove files from the sandbox."""
            return _sandbox_result(session.invoke(method="removeFiles", params={"paths": file_paths}))

        coding_tools = [execute_code, list_files, read_files, write_files, remove_files]
{{coding_agent}}"#;

/// Import line for the code tool.
pub fn code_interpreter_import(managed: bool) -> &'static str {
    if managed {
        "from bedrock_agentcore.tools import code_interpreter_client"
    } else {
        "from interpreter import interpreter"
    }
}

/// `code_tool`: a managed sandbox driven by a coding agent, or a local
/// interpreter bound to the agent's model.
pub fn render_code_interpreter(
    backend: &dyn ProfileBackend,
    managed: bool,
    model: &ResolvedModel,
    region: &str,
) -> String {
    if managed {
        fill(
            MANAGED_INTERPRETER,
            &[
                ("doc", CODE_TOOL_DOC),
                ("region", &string_literal(region)),
                ("coding_agent", &indent(backend.coding_agent(), 2)),
            ],
        )
    } else {
        fill(
            LOCAL_INTERPRETER,
            &[
                ("doc", CODE_TOOL_DOC),
                ("model", &string_literal(&format!("bedrock/{}", model.model_id))),
            ],
        )
    }
}

/// What the driver of one module needs to know about it.
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions<'a> {
    pub memory: &'a MemoryVariant,
    pub is_router: bool,
    pub accepts_relay: bool,
    pub pre_processing: bool,
    pub post_processing: bool,
}

/// `expr` as a Python string expression, wrapping it in `str()` unless it
/// already is one.
fn text_expression(expr: &str) -> String {
    if expr.starts_with("str(") && expr.ends_with(')') {
        expr.to_string()
    } else {
        format!("str({expr})")
    }
}

/// Module state, `get_agent` and `invoke_agent`.
pub fn render_driver(backend: &dyn ProfileBackend, opts: DriverOptions<'_>) -> String {
    let parts = backend.invoke_parts();
    let mut state = vec![
        "_agent = None".to_string(),
        "last_input = \"\"".to_string(),
        "user_id = \"\"".to_string(),
    ];
    if opts.is_router {
        state.push("last_agent = \"\"".to_string());
    }

    let mut rebuild: Vec<String> = Vec::new();
    let synopsis = opts.memory.synopsis();
    if !synopsis.is_empty() {
        rebuild.push(synopsis.to_string());
    }
    rebuild.push("system_prompt = ORCHESTRATION_TEMPLATE".to_string());
    if opts.memory.is_enabled() {
        rebuild.push("system_prompt = system_prompt.replace(\"$memory_synopsis$\", memory_synopsis)".to_string());
    }
    rebuild.push(backend.build_agent().to_string());
    let get_agent = format!(
        "def get_agent():\n    global _agent\n    if {}:\n{}\n    return _agent",
        opts.memory.rebuild_condition(),
        indent(&rebuild.join("\n"), 2)
    );

    let signature = if opts.accepts_relay {
        "def invoke_agent(question: str, relayed_messages=None):"
    } else {
        "def invoke_agent(question: str):"
    };
    let mut globals = vec!["last_input"];
    if opts.is_router {
        globals.push("last_agent");
    }
    let mut body: Vec<String> = vec![
        format!("global {}", globals.join(", ")),
        "last_input = question".to_string(),
        "agent = get_agent()".to_string(),
    ];
    if opts.accepts_relay {
        body.push(format!("if relayed_messages:\n{}", indent(parts.relay, 1)));
    }
    if opts.is_router {
        body.push(parts.conversation.to_string());
        body.push(render_router_dispatch(parts.classify, parts.history));
    }
    if opts.pre_processing {
        body.push(parts.pre_process.to_string());
        body.push("question += \"\\n<PRE_PROCESSING>{}</PRE_PROCESSING>\".format(pre_process_output)".to_string());
    }
    if let Some(record) = opts.memory.record_turn("user", "question") {
        body.push(record);
    }
    body.push(parts.run.to_string());
    if let Some(record) = opts
        .memory
        .record_turn("assistant", &text_expression(parts.latest_response))
    {
        body.push(record);
    }
    if opts.post_processing {
        body.push(format!(
            "post_process_prompt = POST_PROCESSING_TEMPLATE.replace(\"$question$\", question).replace(\"$latest_response$\", {}).replace(\"$responses$\", {})",
            parts.latest_response, parts.responses
        ));
        body.push(parts.post_process.to_string());
    } else {
        body.push(parts.plain_return.to_string());
    }
    let invoke_agent = format!("{signature}\n{}", indent(&body.join("\n"), 1));

    [
        backend.agent_helpers().to_string(),
        state.join("\n"),
        get_agent,
        invoke_agent,
    ]
    .join("\n\n\n")
}

const URL_PATTERN: &str = r"(?:https?://|www\.)(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}(?:/[^/\s]*)*";

const ENDPOINT: &str = r#"{{decorator}}def endpoint(payload, context):
    try:
{{user}}        session_id = context.session_id or payload.get("sessionId", uuid.uuid4().hex[:8])

        tools_used.clear()
        agent_query = payload.get("message", "")
        if not agent_query:
            return {"error": "No query provided, please provide a 'message' field in the payload."}

        agent_result = invoke_agent(agent_query)

{{tools_used_update}}
        response_content = {{response_content}}

        sources = []
        sources.extend(re.findall(r"{{url_pattern}}", response_content))
        sources.extend(re.findall(r"<source>(.*?)</source>", response_content))
        sources = sorted(set(sources))

        formatted_messages = [(agent_query, "USER"), (response_content if response_content else "No Response.", "ASSISTANT")]
{{store}}
        return {
            "result": {
                "response": response_content,
                "sources": sources,
                "tools_used": list(tools_used),
                "sessionId": session_id,
                "messages": formatted_messages,
            }
        }
    except Exception as e:
        return {"error": str(e)}"#;

/// Entrypoint taking a `{"message": ...}` payload. Only the root module
/// registers it with the runtime app.
pub fn render_entrypoint(backend: &dyn ProfileBackend, memory: &MemoryVariant, is_root: bool) -> String {
    let user = match memory {
        MemoryVariant::Managed { .. } => {
            "        global user_id\n        user_id = user_id or payload.get(\"userId\", uuid.uuid4().hex[:8])\n"
        }
        _ => "",
    };
    let store = memory
        .store_exchange()
        .map(|s| format!("{}\n", indent(s, 2)))
        .unwrap_or_default();
    fill(
        ENDPOINT,
        &[
            ("decorator", if is_root { "@app.entrypoint\n" } else { "" }),
            ("user", user),
            ("tools_used_update", &indent(backend.tools_used_update(), 2)),
            ("response_content", backend.response_content()),
            ("url_pattern", URL_PATTERN),
            ("store", &store),
        ],
    )
}

const CLI: &str = r#"def cli():
    global user_id
    user_id = uuid.uuid4().hex[:8].lower()
    session_id = uuid.uuid4().hex[:8].lower()
    try:
        while True:
            try:
                query = inputimeout("\nEnter your question (or 'exit' to quit): ", timeout={{timeout}})
            except TimeoutOccurred:
                print("\nNo input for {{timeout}} seconds, ending the session.")
                break
            if query.lower() == "exit":
                break

            result = endpoint({"message": query}, RequestContext(session_id=session_id))
            if "error" in result:
                print("  Error: " + str(result["error"]))
                continue
            result = result["result"]
            print(f"\nResponse: {result.get('response', 'No response provided')}")
            if result.get("sources"):
                print(f"\nSources: {', '.join(result['sources'])}")
            if result.get("tools_used"):
                print(f"\nTools Used: {', '.join(result['tools_used'])}")
    except KeyboardInterrupt:
        print("\nExiting...")
{{finally}}"#;

/// Interactive loop and `__main__` guard. `end_sessions` runs when the loop
/// exits, if the module owns sessions to close.
pub fn render_usage(idle_timeout_secs: u64, end_sessions: Option<&str>, is_root: bool) -> String {
    let finally = end_sessions
        .map(|stmt| format!("    finally:\n        {stmt}"))
        .unwrap_or_default();
    let cli = fill(
        CLI,
        &[("timeout", &idle_timeout_secs.to_string()), ("finally", &finally)],
    );
    let main = if is_root {
        "if __name__ == \"__main__\":\n    if \"--cli\" in sys.argv:\n        cli()\n    else:\n        app.run()"
    } else {
        "if __name__ == \"__main__\":\n    cli()"
    };
    format!("{}\n\n\n{main}", cli.trim_end())
}
