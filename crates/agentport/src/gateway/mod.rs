//! Gateway proxying: one dispatch function per agent fronting every
//! function-backed action group, registered as gateway targets.

pub mod dispatch;
pub mod routing;
pub mod targets;

use tracing::info;

use crate::emit::format::fill;
use crate::emit::python::string_literal;
use crate::model::AgentDefinition;
use crate::tools::ToolGroup;

pub use dispatch::{DispatchFunction, dispatch_function};
pub use routing::{RoutedOperation, RoutingEntry, routing_table};
pub use targets::{GatewayTargetRequest, gateway_targets, mcp_tool};

/// OAuth client fields a gateway handle carries, in env-file order.
pub const CREDENTIAL_KEYS: [&str; 6] = [
    "client_id",
    "client_secret",
    "user_pool_id",
    "token_endpoint",
    "scope",
    "domain_prefix",
];

/// Environment variable holding credential `key`.
pub fn credential_env_key(prefix: &str, key: &str) -> String {
    format!("{prefix}cognito_{key}")
}

#[derive(Debug, Clone)]
pub struct GatewayPlan {
    pub dispatch: DispatchFunction,
    pub targets: Vec<GatewayTargetRequest>,
}

/// Plan for `agent`, or `None` when no group is served through a gateway.
pub fn compile(agent: &AgentDefinition, groups: &[ToolGroup]) -> Option<GatewayPlan> {
    let routing = routing_table(groups);
    if routing.is_empty() {
        return None;
    }
    let targets = gateway_targets(groups);
    info!(
        "gateway for '{}': {} dispatch keys across {} targets",
        agent.name,
        routing.len(),
        targets.len()
    );
    Some(GatewayPlan {
        dispatch: dispatch_function(agent, routing),
        targets,
    })
}

const CLIENT_SETUP: &str = r#"gateway_client = GatewayClient(region_name={{region}})
client_info = {
{{client_info}}
}

access_token = gateway_client.get_access_token_for_cognito(client_info)
mcp_url = {{url}}
headers = {
    "Content-Type": "application/json",
    "Authorization": f"Bearer {access_token}",
}"#;

/// Token acquisition shared by both profiles' MCP clients.
pub fn render_client_setup(region: &str, url: &str, env_prefix: &str) -> String {
    let client_info = CREDENTIAL_KEYS
        .iter()
        .map(|key| {
            format!(
                "    {}: os.environ.get({}, \"\"),",
                string_literal(key),
                string_literal(&credential_env_key(env_prefix, key))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    fill(
        CLIENT_SETUP,
        &[
            ("region", &string_literal(region)),
            ("client_info", &client_info),
            ("url", &string_literal(url)),
        ],
    )
}
