//! The closed set of `$name$` placeholders prompt templates may carry.

use std::fmt;

/// When a placeholder receives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Filled from the fixture table.
    Fixture,
    /// Filled from the agent definition being translated.
    Definition,
    /// Left in the template; the generated code fills it per call.
    Runtime,
}

/// Agent capability a placeholder depends on. Placeholders of a disabled
/// feature are removed instead of filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    KnowledgeBases,
    Memory,
    UserInput,
    ActionGroups,
    CodeInterpreter,
}

macro_rules! placeholders {
    ($($variant:ident => $name:literal, $phase:ident, $feature:expr;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Placeholder {
            $($variant,)+
        }

        impl Placeholder {
            /// Every placeholder in substitution order.
            pub const ALL: &'static [Placeholder] = &[$(Placeholder::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Placeholder::$variant => $name,)+
                }
            }

            pub fn phase(self) -> Phase {
                match self {
                    $(Placeholder::$variant => Phase::$phase,)+
                }
            }

            pub fn feature(self) -> Option<Feature> {
                match self {
                    $(Placeholder::$variant => $feature,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Placeholder> {
                match name {
                    $($name => Some(Placeholder::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

placeholders! {
    AskUserMissingInformation => "ask_user_missing_information", Fixture, Some(Feature::UserInput);
    RespondToUserGuideline => "respond_to_user_guideline", Fixture, Some(Feature::UserInput);
    KnowledgeBaseGuideline => "knowledge_base_guideline", Fixture, Some(Feature::KnowledgeBases);
    KnowledgeBaseAdditionalGuideline => "knowledge_base_additional_guideline", Fixture, Some(Feature::KnowledgeBases);
    RespondToUserKnowledgeBaseAdditionalGuideline => "respond_to_user_knowledge_base_additional_guideline", Fixture, Some(Feature::KnowledgeBases);
    MemoryGuideline => "memory_guideline", Fixture, Some(Feature::Memory);
    MemoryContent => "memory_content", Fixture, Some(Feature::Memory);
    MemoryActionGuideline => "memory_action_guideline", Fixture, Some(Feature::Memory);
    PromptSessionAttributes => "prompt_session_attributes", Fixture, Some(Feature::ActionGroups);
    CodeInterpreterGuideline => "code_interpreter_guideline", Fixture, Some(Feature::CodeInterpreter);
    CodeInterpreterFiles => "code_interpreter_files", Fixture, Some(Feature::CodeInterpreter);
    MultiAgentCollaborationGuideline => "multi_agent_collaboration_guideline", Fixture, None;
    MultiAgentPayloadReferenceGuideline => "multi_agent_payload_reference_guideline", Fixture, None;
    ActionKbGuideline => "action_kb_guideline", Fixture, None;
    Functions => "functions", Fixture, None;
    Tools => "tools", Fixture, None;
    AgentScratchpad => "agent_scratchpad", Fixture, None;
    ConversationHistory => "conversation_history", Fixture, None;
    Instruction => "instruction", Definition, None;
    AgentCollaborators => "agent_collaborators", Definition, None;
    ReachableAgents => "reachable_agents", Definition, None;
    ToolsForRouting => "tools_for_routing", Definition, None;
    KnowledgeBasesForRouting => "knowledge_bases_for_routing", Definition, None;
    Question => "question", Runtime, None;
    LatestResponse => "latest_response", Runtime, None;
    Responses => "responses", Runtime, None;
    SearchResults => "search_results", Runtime, Some(Feature::KnowledgeBases);
    MemorySynopsis => "memory_synopsis", Runtime, Some(Feature::Memory);
    PastConversationSummary => "past_conversation_summary", Runtime, Some(Feature::Memory);
    Conversation => "conversation", Runtime, None;
    LastUserRequest => "last_user_request", Runtime, None;
    LastMostSpecializedAgent => "last_most_specialized_agent", Runtime, None;
}

impl Placeholder {
    /// The `$name$` token as it appears in templates.
    pub fn token(self) -> String {
        format!("${}$", self.name())
    }

    /// Filled while translating, as opposed to by the generated code.
    pub fn is_compile_time(self) -> bool {
        self.phase() != Phase::Runtime
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}$", self.name())
    }
}

/// Names of every `$name$` token in `text`, in order of appearance.
///
/// A token is a `$`, one or more lowercase letters or underscores, and a
/// closing `$`. Anything else (prices, shell variables) is ignored.
pub fn scan_tokens(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_lowercase() || bytes[end] == b'_') {
            end += 1;
        }
        if end > start && end < bytes.len() && bytes[end] == b'$' {
            out.push(&text[start..end]);
            i = end + 1;
        } else {
            i = start;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for &p in Placeholder::ALL {
            assert_eq!(Placeholder::from_name(p.name()), Some(p));
        }
        assert_eq!(Placeholder::from_name("mystery"), None);
        assert_eq!(Placeholder::Instruction.token(), "$instruction$");
        assert_eq!(Placeholder::MemorySynopsis.to_string(), "$memory_synopsis$");
    }

    #[test]
    fn scanner_finds_tokens_and_skips_noise() {
        let text = "Costs $5 or $10. $instruction$ then $question$ and $ a $b$c$";
        assert_eq!(scan_tokens(text), vec!["instruction", "question", "b"]);
        assert!(scan_tokens("$$ $_$").contains(&"_"));
        assert!(scan_tokens("no tokens here").is_empty());
    }

    #[test]
    fn runtime_placeholders_are_not_compile_time() {
        assert!(!Placeholder::Question.is_compile_time());
        assert!(Placeholder::Instruction.is_compile_time());
        assert!(Placeholder::CodeInterpreterFiles.is_compile_time());
        assert_eq!(Placeholder::SearchResults.feature(), Some(Feature::KnowledgeBases));
    }
}
