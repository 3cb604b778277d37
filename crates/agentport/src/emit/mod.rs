//! Module assembly and output writing.
//!
//! Everything a run produces is assembled in memory as [`OutputFile`]s; only
//! once the whole tree has compiled are the files written out.

pub mod format;
pub mod python;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info};

use crate::error::{Result, TranslateError};
use format::tidy;

/// One file of a translation, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: String,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Sections of a generated agent module, emitted in declaration order.
#[derive(Debug, Default, Clone)]
pub struct ModuleSections {
    pub imports: String,
    pub models: String,
    pub prompts: String,
    pub collaboration: String,
    pub tools: String,
    pub memory: String,
    pub knowledge_bases: String,
    pub agent_setup: String,
    pub usage: String,
}

impl ModuleSections {
    pub fn assemble(&self) -> String {
        let sections = [
            &self.imports,
            &self.models,
            &self.prompts,
            &self.collaboration,
            &self.tools,
            &self.memory,
            &self.knowledge_bases,
            &self.agent_setup,
            &self.usage,
        ];
        let body = sections
            .iter()
            .map(|s| s.trim_matches('\n'))
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n\n");
        tidy(&body)
    }
}

/// `KEY=value` lines in the given order.
pub fn render_env_file(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}

/// Pretty JSON with object keys sorted at every level.
pub fn canonical_json(value: &JsonValue, what: &str) -> Result<String> {
    let mut out = serde_json::to_string_pretty(&sorted(value)).map_err(|source| {
        TranslateError::Serialize {
            what: what.to_string(),
            source,
        }
    })?;
    out.push('\n');
    Ok(out)
}

fn sorted(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let ordered: BTreeMap<&String, JsonValue> =
                map.iter().map(|(k, v)| (k, sorted(v))).collect();
            let mut out = JsonMap::new();
            for (key, item) in ordered {
                out.insert(key.clone(), item);
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Write every file under `dir`, creating directories as needed.
pub async fn write_files(dir: &Path, files: &[OutputFile]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| TranslateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    for file in files {
        let path = dir.join(&file.path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TranslateError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, &file.contents)
            .await
            .map_err(|source| TranslateError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("wrote {} ({} bytes)", path.display(), file.contents.len());
    }
    info!("wrote {} file(s) to {}", files.len(), dir.display());
    Ok(())
}
