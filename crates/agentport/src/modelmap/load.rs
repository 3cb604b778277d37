use anyhow::Context;

use super::default::{default_known_providers, default_model_tokens, default_provider_aliases};
use super::{Canonical, ModelMap, RawEntry, RawMappingFile};

/// Built-in map extended with the entries of a TOML mapping file.
pub fn from_toml_str(s: &str) -> anyhow::Result<ModelMap> {
    let raw: RawMappingFile = toml::from_str(s)?;
    Ok(build_model_map(raw))
}

pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<ModelMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading model map {}", path.display()))?;
    from_toml_str(&content).with_context(|| format!("parsing model map {}", path.display()))
}

pub fn load_default() -> ModelMap {
    ModelMap {
        by_token: default_model_tokens(),
        provider_aliases: default_provider_aliases(),
        known_providers: default_known_providers(),
    }
}

fn build_model_map(raw: RawMappingFile) -> ModelMap {
    let mut map = load_default();
    for e in raw.mappings.into_iter() {
        insert_entry(&mut map.by_token, &e);
        if let Some(aliases) = e.aliases.as_ref() {
            for a in aliases {
                let mut alias = e.clone();
                alias.token = a.clone();
                insert_entry(&mut map.by_token, &alias);
            }
        }
    }
    if let Some(m) = raw.provider_aliases {
        for (k, v) in m.into_iter() {
            let canon = v.to_ascii_lowercase();
            if !map.known_providers.contains(&canon) {
                map.known_providers.push(canon.clone());
            }
            map.provider_aliases.insert(k.to_ascii_lowercase(), canon);
        }
    }
    map
}

fn insert_entry(map: &mut std::collections::HashMap<String, Canonical>, e: &RawEntry) {
    let key = e.token.to_ascii_lowercase();
    map.insert(
        key,
        Canonical {
            model: e.to_model.clone(),
            provider: e.to_provider.as_ref().map(|p| p.to_ascii_lowercase()),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_build_map() {
        let toml = r#"
[[mappings]]
token = "House Model"
to_model = "arn:aws:bedrock:us-east-1:1:custom-model/house"
to_provider = "Meta"
aliases = ["house"]
[provider_aliases]
Writer = "writer"
Acme = "acme"
"#;
        let m = from_toml_str(toml).expect("parse ok");
        let entry = m.by_token.get("house model").expect("entry");
        assert_eq!(entry.provider.as_deref(), Some("meta"));
        assert!(m.by_token.contains_key("house"));
        assert!(m.by_token.contains_key("nova pro"));
        assert_eq!(m.provider_aliases.get("acme").map(String::as_str), Some("acme"));
        assert!(m.known_providers.iter().any(|p| p == "acme"));
    }

    #[test]
    fn malformed_files_are_errors() {
        assert!(from_toml_str("[[mappings]]\nto_model = 1").is_err());
        assert!(load_from_file(std::path::Path::new("/no/such/models.toml")).is_err());
    }
}
