use super::types::Canonical;
use std::collections::HashMap;

/// Provider used when nothing else identifies one.
pub const FALLBACK_PROVIDER: &str = "anthropic";

/// Cross-region inference prefixes that precede the vendor segment.
pub const REGION_PREFIXES: [&str; 4] = ["us", "eu", "apac", "global"];

pub fn default_provider_aliases() -> HashMap<String, String> {
    let mut m = HashMap::new();
    for (alias, canon) in [
        ("Anthropic", "anthropic"),
        ("Claude", "anthropic"),
        ("Amazon", "amazon"),
        ("Nova", "amazon"),
        ("Titan", "amazon"),
        ("Meta", "meta"),
        ("Llama", "meta"),
        ("Mistral", "mistral"),
        ("MistralAI", "mistral"),
        ("Cohere", "cohere"),
        ("AI21", "ai21"),
        ("DeepSeek", "deepseek"),
    ] {
        m.insert(alias.to_ascii_lowercase(), canon.to_string());
    }
    m
}

pub fn default_known_providers() -> Vec<String> {
    [
        "anthropic", "amazon", "meta", "mistral", "cohere", "ai21", "deepseek", "writer",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

pub fn default_model_tokens() -> HashMap<String, Canonical> {
    let mut m: HashMap<String, Canonical> = HashMap::new();

    let mk = |model: &str, provider: &str| Canonical {
        model: Some(model.to_string()),
        provider: Some(provider.to_string()),
    };

    // Short names people put in hand-written definitions
    m.insert("claude 3 haiku".into(), mk("anthropic.claude-3-haiku-20240307-v1:0", "anthropic"));
    m.insert("claude 3 sonnet".into(), mk("anthropic.claude-3-sonnet-20240229-v1:0", "anthropic"));
    m.insert("claude 3.5 sonnet".into(), mk("anthropic.claude-3-5-sonnet-20240620-v1:0", "anthropic"));
    m.insert("claude 3.5 haiku".into(), mk("anthropic.claude-3-5-haiku-20241022-v1:0", "anthropic"));
    m.insert("nova pro".into(), mk("amazon.nova-pro-v1:0", "amazon"));
    m.insert("nova lite".into(), mk("amazon.nova-lite-v1:0", "amazon"));
    m.insert("nova micro".into(), mk("amazon.nova-micro-v1:0", "amazon"));

    m
}
