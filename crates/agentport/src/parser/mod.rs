//! Agent definition parsers for the binary front-end.
//!
//! Each parser declares a `supports` predicate over file paths and a `parse`
//! function that returns an `AgentDefinition`.

use std::path::Path;

use anyhow::{Context as _, Result, bail};

use crate::model::AgentDefinition;

/// Parser trait implemented by each definition file format.
pub trait DefinitionParser {
    fn supports(path: &Path) -> bool;
    fn parse(content: &str, path: &Path) -> Result<AgentDefinition>;
}

pub mod json;
pub mod yaml;

pub use json::JsonDefinitionParser;
pub use yaml::YamlDefinitionParser;

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Read and parse a definition file, picking the parser by extension.
pub fn parse_definition_file(path: &Path) -> Result<AgentDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading definition {}", path.display()))?;
    if JsonDefinitionParser::supports(path) {
        JsonDefinitionParser::parse(&content, path)
    } else if YamlDefinitionParser::supports(path) {
        YamlDefinitionParser::parse(&content, path)
    } else {
        bail!(
            "unsupported definition format {} (expected .json, .yaml or .yml)",
            path.display()
        )
    }
}
