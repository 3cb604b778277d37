use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ModelMap {
    /// Lower-cased model token -> canonical entry.
    pub by_token: HashMap<String, Canonical>,
    /// Lower-cased provider alias -> canonical provider.
    pub provider_aliases: HashMap<String, String>,
    /// Providers recognized from the vendor segment of a model id.
    pub known_providers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canonical {
    /// Replacement model id, when the token is only an alias.
    pub model: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMappingFile {
    #[serde(default)]
    pub mappings: Vec<RawEntry>,
    #[serde(default)]
    pub provider_aliases: Option<HashMap<String, String>>, // alias -> canonical
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawEntry {
    pub token: String,
    #[serde(default)]
    pub to_model: Option<String>,
    #[serde(default)]
    pub to_provider: Option<String>,
    #[serde(default)]
    pub aliases: Option<Vec<String>>, // additional tokens mapping to the same entry
}

/// Model id and provider family used for every model declaration of an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub model_id: String,
    pub provider: String,
}

impl ResolvedModel {
    /// Providers whose models accept `top_k` and `stop_sequences`.
    pub fn supports_sampling_extras(&self) -> bool {
        matches!(self.provider.as_str(), "anthropic" | "amazon")
    }
}
