//! Fixture table: the text substituted for fixture placeholders.
//!
//! Built-in texts cover every fixture placeholder. A TOML file with a
//! `[fixtures]` table keyed by placeholder name may override any of them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::placeholder::{Phase, Placeholder, scan_tokens};
use crate::error::{Result, TranslateError};

const ASK_USER_MISSING_INFORMATION: &str = "If you do not have all the parameters needed to call a \
function, ask the user for the missing values with the user input tool before calling it. Never \
guess or invent parameter values.";

const RESPOND_TO_USER_GUIDELINE: &str = "When you need the user to clarify or decide something, ask \
a single focused question and wait for the answer before continuing.";

const KNOWLEDGE_BASE_GUIDELINE: &str = "Use the knowledge base tools to look up facts before \
answering questions about documented topics.";

const KNOWLEDGE_BASE_ADDITIONAL_GUIDELINE: &str = "Only rely on knowledge base results that \
directly answer the question. When you use a result, cite its location inside <source></source> \
tags.";

const RESPOND_TO_USER_KNOWLEDGE_BASE_ADDITIONAL_GUIDELINE: &str = "If the knowledge base does not \
contain the answer, say so plainly instead of guessing.";

const MEMORY_GUIDELINE: &str = "You have access to summaries of earlier sessions with this user. \
Use them to keep continuity, but prefer what the user says in the current session when the two \
disagree.";

const MEMORY_CONTENT: &str = "<memory_synopsis>\n$memory_synopsis$\n</memory_synopsis>";

const MEMORY_ACTION_GUIDELINE: &str = "Do not mention the session summaries unless the user asks \
about previous conversations.";

const PROMPT_SESSION_ATTRIBUTES: &str = "";

const CODE_INTERPRETER_GUIDELINE: &str = "Use the code tool for calculations, data processing and \
any task that benefits from running code. Pass it the original question rather than code.";

const CODE_INTERPRETER_FILES: &str = "";

const MULTI_AGENT_COLLABORATION_GUIDELINE: &str = "Delegate a request to the collaborator whose \
description matches it best. Pass along every detail the collaborator needs, since it cannot see \
this conversation unless history is relayed.";

const MULTI_AGENT_PAYLOAD_REFERENCE_GUIDELINE: &str = "";

const ACTION_KB_GUIDELINE: &str = "Prefer calling a function over searching a knowledge base when \
both could answer the question.";

/// Built-in fixture values in substitution order.
const BUILT_IN: &[(Placeholder, &str)] = &[
    (Placeholder::AskUserMissingInformation, ASK_USER_MISSING_INFORMATION),
    (Placeholder::RespondToUserGuideline, RESPOND_TO_USER_GUIDELINE),
    (Placeholder::KnowledgeBaseGuideline, KNOWLEDGE_BASE_GUIDELINE),
    (Placeholder::KnowledgeBaseAdditionalGuideline, KNOWLEDGE_BASE_ADDITIONAL_GUIDELINE),
    (
        Placeholder::RespondToUserKnowledgeBaseAdditionalGuideline,
        RESPOND_TO_USER_KNOWLEDGE_BASE_ADDITIONAL_GUIDELINE,
    ),
    (Placeholder::MemoryGuideline, MEMORY_GUIDELINE),
    (Placeholder::MemoryContent, MEMORY_CONTENT),
    (Placeholder::MemoryActionGuideline, MEMORY_ACTION_GUIDELINE),
    (Placeholder::PromptSessionAttributes, PROMPT_SESSION_ATTRIBUTES),
    (Placeholder::CodeInterpreterGuideline, CODE_INTERPRETER_GUIDELINE),
    (Placeholder::CodeInterpreterFiles, CODE_INTERPRETER_FILES),
    (Placeholder::MultiAgentCollaborationGuideline, MULTI_AGENT_COLLABORATION_GUIDELINE),
    (Placeholder::MultiAgentPayloadReferenceGuideline, MULTI_AGENT_PAYLOAD_REFERENCE_GUIDELINE),
    (Placeholder::ActionKbGuideline, ACTION_KB_GUIDELINE),
    // Native tool calling replaces the text-rendered tool catalog and scratchpad.
    (Placeholder::Functions, ""),
    (Placeholder::Tools, ""),
    (Placeholder::AgentScratchpad, ""),
    (Placeholder::ConversationHistory, ""),
];

#[derive(Debug, Deserialize)]
struct RawFixtureFile {
    #[serde(default)]
    fixtures: BTreeMap<String, String>,
}

/// Values for every fixture placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureTable {
    values: BTreeMap<Placeholder, String>,
}

impl Default for FixtureTable {
    fn default() -> Self {
        Self::built_in()
    }
}

impl FixtureTable {
    pub fn built_in() -> Self {
        Self {
            values: BUILT_IN
                .iter()
                .map(|(p, text)| (*p, (*text).to_string()))
                .collect(),
        }
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    /// Replace one fixture value after checking it.
    pub fn set(&mut self, placeholder: Placeholder, value: String) -> Result<()> {
        if placeholder.phase() != Phase::Fixture {
            return Err(TranslateError::UnknownPlaceholder {
                prompt: "fixture table".to_string(),
                name: placeholder.name().to_string(),
            });
        }
        validate_fixture(placeholder.name(), &value)?;
        self.values.insert(placeholder, value);
        Ok(())
    }

    /// Built-in table with the overrides of a TOML fixture file applied.
    ///
    /// The file must exist and parse; an unknown key or a key naming a
    /// non-fixture placeholder is rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let fixture_error = |message: String| TranslateError::FixtureFile {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        let raw: RawFixtureFile =
            toml::from_str(&content).map_err(|e| fixture_error(e.to_string()))?;
        let mut table = Self::built_in();
        for (key, value) in raw.fixtures {
            let placeholder = Placeholder::from_name(&key)
                .ok_or_else(|| fixture_error(format!("unknown fixture `{key}`")))?;
            if placeholder.phase() != Phase::Fixture {
                return Err(fixture_error(format!("`{key}` is not a fixture placeholder")));
            }
            validate_fixture(&key, &value)?;
            debug!("fixture override for {}", placeholder);
            table.values.insert(placeholder, value);
        }
        info!("loaded fixture overrides from {}", path.display());
        Ok(table)
    }
}

/// Fixture values may reference runtime placeholders only.
fn validate_fixture(name: &str, value: &str) -> Result<()> {
    for token in scan_tokens(value) {
        match Placeholder::from_name(token) {
            None => {
                return Err(TranslateError::UnknownPlaceholder {
                    prompt: format!("fixture {name}"),
                    name: token.to_string(),
                });
            }
            Some(p) if p.is_compile_time() => {
                return Err(TranslateError::NestedPlaceholder {
                    fixture: name.to_string(),
                    nested: token.to_string(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
