use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub translate: Option<TranslateCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TranslateCfg {
    pub definition: Option<String>,
    pub output_dir: Option<String>,
    /// "langgraph" or "strands"
    pub profile: Option<String>,
    pub gateway: Option<bool>,
    pub model_map_file: Option<String>,
    pub fixtures_file: Option<String>,
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: UserConfig =
        toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

/// `<explicit>`, else `$HOME/.agentport`, else `./.agentport`.
pub fn agentport_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return expand_home(explicit);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".agentport");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".agentport")
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Environment value when set and non-empty, else the config file value.
pub fn pick(env: &str, file: Option<&String>) -> Option<String> {
    if !env.trim().is_empty() {
        return Some(env.trim().to_string());
    }
    file.filter(|v| !v.trim().is_empty()).cloned()
}

/// Parse a boolean environment value; empty means unset.
pub fn parse_flag(value: &str) -> anyhow::Result<Option<bool>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => anyhow::bail!("invalid boolean '{other}'"),
    }
}
