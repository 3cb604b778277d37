//! Templates used when a definition does not configure a prompt the
//! generated agent depends on.

use crate::model::PromptType;

const ORCHESTRATION: &str = "$instruction$

You have been provided with a set of tools to answer the user's question. Always follow these \
guidelines:
$ask_user_missing_information$
$knowledge_base_guideline$
$code_interpreter_guideline$
$memory_guideline$
$memory_content$
$prompt_session_attributes$";

const MEMORY_SUMMARIZATION: &str = "You summarize conversations between a user and an AI \
assistant so that later sessions can pick up where this one ended.

Summaries of earlier sessions:
<past_conversation_summary>
$past_conversation_summary$
</past_conversation_summary>

Summarize the conversation below. Keep the user's goals, the decisions that were made and any \
facts the assistant will need later. Write plain prose without preamble.
<conversation>
$conversation$
</conversation>";

const ROUTING_CLASSIFIER: &str = "You route each user request to the agent best suited to \
handle it.

These agents are available:
<agents>
$reachable_agents$
</agents>

The supervisor can also use these tools itself: $tools_for_routing$
and these knowledge bases: $knowledge_bases_for_routing$

Conversation so far:
<conversation>
$conversation$
</conversation>

Agent that handled the previous request: $last_most_specialized_agent$
Latest user request: $last_user_request$

Answer with exactly one choice wrapped in <a></a> tags: the collaborator name of the agent that \
should handle the request, keep_previous_agent when the previous agent should continue, or \
undecidable when the supervisor should answer itself.";

/// Fallback template for `kind`, when one exists.
pub fn default_template(kind: PromptType) -> Option<&'static str> {
    match kind {
        PromptType::Orchestration => Some(ORCHESTRATION),
        PromptType::MemorySummarization => Some(MEMORY_SUMMARIZATION),
        PromptType::RoutingClassifier => Some(ROUTING_CLASSIFIER),
        PromptType::PreProcessing
        | PromptType::PostProcessing
        | PromptType::KnowledgeBaseResponseGeneration => None,
    }
}
