//! Deployment provisioner interface and a recording implementation.
//!
//! The translator never creates cloud resources itself; it asks a
//! [`Provisioner`] and embeds the handles that come back. [`PlanProvisioner`]
//! answers with deterministic handles and records every request, so a run
//! without cloud access still yields complete modules plus a plan of what a
//! deployment has to create.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;

use crate::emit::canonical_json;
use crate::error::{Result, TranslateError};
use crate::gateway::{CREDENTIAL_KEYS, DispatchFunction, GatewayTargetRequest};
use crate::memory::ManagedMemoryStrategy;
use crate::model::clean_variable_name;

/// Plan file written next to the generated modules.
pub const PLAN_FILE: &str = "provisioning_plan.json";

/// A provisioned gateway: where agents reach it and how they authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayHandle {
    pub name: String,
    pub url: String,
    pub region: String,
    /// OAuth client fields in [`CREDENTIAL_KEYS`] order.
    pub credentials: Vec<(String, String)>,
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision_gateway(&self, agent_name: &str, region: &str) -> anyhow::Result<GatewayHandle>;

    /// Deploy the dispatch function; returns its function reference.
    async fn provision_dispatch_endpoint(&self, function: &DispatchFunction) -> anyhow::Result<String>;

    /// Register one action group behind `gateway`; returns the target id.
    async fn provision_gateway_target(
        &self,
        gateway: &GatewayHandle,
        target: &GatewayTargetRequest,
        function_ref: &str,
    ) -> anyhow::Result<String>;

    /// Create a memory resource; returns its id.
    async fn provision_managed_memory(
        &self,
        name: &str,
        strategy: &ManagedMemoryStrategy,
        region: &str,
    ) -> anyhow::Result<String>;
}

/// One recorded provisioning call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvisionRequest {
    Gateway {
        name: String,
        region: String,
        url: String,
    },
    DispatchEndpoint {
        function: DispatchFunction,
        function_ref: String,
    },
    GatewayTarget {
        gateway: String,
        target: GatewayTargetRequest,
        function_ref: String,
        target_id: String,
    },
    ManagedMemory {
        name: String,
        region: String,
        strategy: ManagedMemoryStrategy,
        memory_id: String,
    },
}

/// Records requests and answers with handles derived from the request.
#[derive(Default)]
pub struct PlanProvisioner {
    requests: Mutex<Vec<ProvisionRequest>>,
}

impl PlanProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn requests(&self) -> Vec<ProvisionRequest> {
        self.requests.lock().await.clone()
    }

    /// Recorded requests as canonical JSON.
    pub async fn plan_json(&self) -> Result<String> {
        let requests = self.requests.lock().await;
        let value = serde_json::to_value(&*requests).map_err(|source| TranslateError::Serialize {
            what: PLAN_FILE.to_string(),
            source,
        })?;
        canonical_json(&json!({ "requests": value }), PLAN_FILE)
    }

    async fn record(&self, request: ProvisionRequest) {
        self.requests.lock().await.push(request);
    }
}

#[async_trait]
impl Provisioner for PlanProvisioner {
    async fn provision_gateway(&self, agent_name: &str, region: &str) -> anyhow::Result<GatewayHandle> {
        let name = format!("{}-gateway", clean_variable_name(agent_name).replace('_', "-"));
        let url = format!("https://{name}.gateway.bedrock-agentcore.{region}.amazonaws.com/mcp");
        let credentials = CREDENTIAL_KEYS
            .iter()
            .map(|key| (key.to_string(), format!("<{name}:{key}>")))
            .collect();
        info!("plan: gateway {name} in {region}");
        self.record(ProvisionRequest::Gateway {
            name: name.clone(),
            region: region.to_string(),
            url: url.clone(),
        })
        .await;
        Ok(GatewayHandle {
            name,
            url,
            region: region.to_string(),
            credentials,
        })
    }

    async fn provision_dispatch_endpoint(&self, function: &DispatchFunction) -> anyhow::Result<String> {
        let function_ref = format!(
            "arn:aws:lambda:{}:000000000000:function:{}",
            function.region, function.name
        );
        info!(
            "plan: dispatch endpoint {} ({} routes)",
            function.name,
            function.routing.len()
        );
        self.record(ProvisionRequest::DispatchEndpoint {
            function: function.clone(),
            function_ref: function_ref.clone(),
        })
        .await;
        Ok(function_ref)
    }

    async fn provision_gateway_target(
        &self,
        gateway: &GatewayHandle,
        target: &GatewayTargetRequest,
        function_ref: &str,
    ) -> anyhow::Result<String> {
        let target_id = format!("{}/{}", gateway.name, target.name);
        info!("plan: gateway target {target_id} ({} tools)", target.tools.len());
        self.record(ProvisionRequest::GatewayTarget {
            gateway: gateway.name.clone(),
            target: target.clone(),
            function_ref: function_ref.to_string(),
            target_id: target_id.clone(),
        })
        .await;
        Ok(target_id)
    }

    async fn provision_managed_memory(
        &self,
        name: &str,
        strategy: &ManagedMemoryStrategy,
        region: &str,
    ) -> anyhow::Result<String> {
        let memory_id = format!("{}_memory", clean_variable_name(name));
        info!("plan: managed memory {memory_id} in {region}");
        self.record(ProvisionRequest::ManagedMemory {
            name: name.to_string(),
            region: region.to_string(),
            strategy: strategy.clone(),
            memory_id: memory_id.clone(),
        })
        .await;
        Ok(memory_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_handles_are_derived_from_the_agent() {
        let provisioner = PlanProvisioner::new();
        let handle = provisioner
            .provision_gateway("Weather Agent", "us-east-1")
            .await
            .expect("gateway");
        assert_eq!(handle.name, "weather-agent-gateway");
        assert_eq!(
            handle.url,
            "https://weather-agent-gateway.gateway.bedrock-agentcore.us-east-1.amazonaws.com/mcp"
        );
        assert_eq!(handle.credentials.len(), CREDENTIAL_KEYS.len());
        assert_eq!(handle.credentials[0].0, "client_id");
    }

    #[tokio::test]
    async fn requests_are_recorded_in_call_order() {
        let provisioner = PlanProvisioner::new();
        let strategy = ManagedMemoryStrategy::session_summarizer();
        let memory_id = provisioner
            .provision_managed_memory("helper", &strategy, "us-west-2")
            .await
            .expect("memory");
        assert_eq!(memory_id, "helper_memory");
        provisioner
            .provision_gateway("helper", "us-west-2")
            .await
            .expect("gateway");
        let requests = provisioner.requests().await;
        assert!(matches!(requests[0], ProvisionRequest::ManagedMemory { .. }));
        assert!(matches!(requests[1], ProvisionRequest::Gateway { .. }));

        let plan = provisioner.plan_json().await.expect("plan");
        assert!(plan.contains("\"kind\": \"managed_memory\""));
        assert!(plan.contains("\"SessionSummarizer\""));
        assert!(plan.ends_with("}\n"));
    }
}
