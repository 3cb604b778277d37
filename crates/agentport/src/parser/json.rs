//! Parser for `.json` agent definitions.

use anyhow::Context as _;
use std::path::Path;

use crate::model::AgentDefinition;

use super::{DefinitionParser, has_extension};

pub struct JsonDefinitionParser;

impl DefinitionParser for JsonDefinitionParser {
    fn supports(path: &Path) -> bool {
        has_extension(path, &["json"])
    }

    fn parse(content: &str, path: &Path) -> anyhow::Result<AgentDefinition> {
        serde_json::from_str(content)
            .with_context(|| format!("parsing JSON definition {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_collaborators() {
        let content = r#"{
            "name": "supervisor",
            "model_id": "anthropic.claude-3-haiku-20240307-v1:0",
            "collaboration": "SUPERVISOR",
            "collaborators": [{
                "name": "billing",
                "instruction": "Billing questions",
                "relay_history": true,
                "agent": {"name": "billing-agent", "model_id": "amazon.nova-lite-v1:0"}
            }]
        }"#;
        let def = JsonDefinitionParser::parse(content, Path::new("a.json")).expect("parse");
        assert!(def.collaboration_enabled());
        assert!(def.collaborators[0].relay_history);
        assert_eq!(def.collaborators[0].agent.name, "billing-agent");
    }

    #[test]
    fn reports_the_file_on_error() {
        let err = JsonDefinitionParser::parse("{", Path::new("broken.json")).expect_err("invalid");
        assert!(format!("{err:#}").contains("broken.json"));
        assert!(JsonDefinitionParser::supports(Path::new("x.JSON")));
        assert!(!JsonDefinitionParser::supports(Path::new("x.yaml")));
    }
}
