//! Parser for `.yaml` / `.yml` agent definitions.

use anyhow::Context as _;
use std::path::Path;

use crate::model::AgentDefinition;

use super::{DefinitionParser, has_extension};

pub struct YamlDefinitionParser;

impl DefinitionParser for YamlDefinitionParser {
    fn supports(path: &Path) -> bool {
        has_extension(path, &["yaml", "yml"])
    }

    fn parse(content: &str, path: &Path) -> anyhow::Result<AgentDefinition> {
        serde_yaml::from_str(content)
            .with_context(|| format!("parsing YAML definition {}", path.display()))
    }
}
