use super::default::{FALLBACK_PROVIDER, REGION_PREFIXES};
use super::{ModelMap, ResolvedModel};
use crate::model::AgentDefinition;

impl ModelMap {
    fn canonical_provider(&self, name: &str) -> Option<String> {
        let key = name.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(canon) = self.provider_aliases.get(&key) {
            return Some(canon.clone());
        }
        self.known_providers.contains(&key).then_some(key)
    }

    /// Provider named by the vendor segment of a model id or ARN.
    fn provider_from_id(&self, model_id: &str) -> Option<String> {
        let tail = model_id.rsplit('/').next().unwrap_or(model_id);
        tail.split('.')
            .find(|segment| !REGION_PREFIXES.contains(segment))
            .and_then(|vendor| self.canonical_provider(vendor))
    }
}

/// Model id and provider family for `agent`.
///
/// An explicit provider wins after alias normalization. A mapped token may
/// rewrite the model id and supply a provider; otherwise the vendor segment
/// of the id is used, then [`FALLBACK_PROVIDER`].
pub fn resolve_model(agent: &AgentDefinition, map: &ModelMap) -> ResolvedModel {
    let entry = map.by_token.get(&agent.model_id.to_ascii_lowercase());
    let model_id = entry
        .and_then(|c| c.model.clone())
        .unwrap_or_else(|| agent.model_id.clone());

    let explicit = agent
        .provider
        .as_deref()
        .and_then(|p| map.canonical_provider(p).or_else(|| Some(p.trim().to_ascii_lowercase())))
        .filter(|p| !p.is_empty());
    let provider = explicit
        .or_else(|| entry.and_then(|c| c.provider.clone()))
        .or_else(|| map.provider_from_id(&model_id));

    let provider = match provider {
        Some(p) => p,
        None => {
            tracing::warn!(
                "no provider for model '{}' of agent '{}', using {}",
                model_id,
                agent.name,
                FALLBACK_PROVIDER
            );
            FALLBACK_PROVIDER.to_string()
        }
    };
    tracing::debug!("agent '{}' model '{}' provider '{}'", agent.name, model_id, provider);
    ResolvedModel { model_id, provider }
}
