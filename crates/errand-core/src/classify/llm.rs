//! LLM-backed classifier.
//!
//! Builds the classification prompt from the versioned taxonomy plus the
//! requester's recent task summaries, requests a low-temperature JSON-only
//! completion, and parses the reply strictly -- rescuing an embedded JSON
//! object when the model wraps it in prose.

use std::sync::OnceLock;

use errand_types::agent::AgentProfile;
use errand_types::classify::{Classification, TaskTypeTag};
use errand_types::error::ClassifyError;
use errand_types::task::Task;
use regex::Regex;

use crate::llm::completion::CompletionClient;

use super::taxonomy::Taxonomy;

/// Sampling temperature for classification. Low: we want determinism,
/// not creativity.
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Classifier that delegates the verdict to a chat-completion model.
pub struct LlmClassifier<C: CompletionClient> {
    client: C,
    taxonomy: Taxonomy,
}

impl<C: CompletionClient> LlmClassifier<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            taxonomy: Taxonomy::v1(),
        }
    }

    /// Replace the built-in taxonomy (e.g. loaded from configuration).
    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    /// Classify one message in the context of the requester's recent tasks.
    ///
    /// Errors here are recoverable: the chain falls back to the keyword
    /// classifier and the caller never sees them.
    pub async fn classify(
        &self,
        message: &str,
        agent: &AgentProfile,
        recent_tasks: &[Task],
    ) -> Result<Classification, ClassifyError> {
        let system = self.taxonomy.render_system_prompt();
        let user = build_user_prompt(message, recent_tasks, agent.memory_window);

        let reply = self
            .client
            .complete(&system, &user, CLASSIFY_TEMPERATURE)
            .await?;

        let mut classification = parse_classification(&reply)?;

        // The model frequently omits the key for image tasks; backfill it
        // from the agent's own credential.
        if classification.kind == TaskTypeTag::ApiCall
            && classification.service_name.as_deref() == Some("image_generation")
            && classification.api_key.is_none()
        {
            classification.api_key = agent.openai_api_key.clone();
        }

        Ok(classification)
    }
}

/// Render the user prompt: up to `memory_window` recent task summaries
/// (oldest first) followed by the message to classify.
fn build_user_prompt(message: &str, recent_tasks: &[Task], memory_window: usize) -> String {
    let mut prompt = String::new();
    if !recent_tasks.is_empty() {
        prompt.push_str("Recent requests from this user (newest first):\n");
        for task in recent_tasks.iter().take(memory_window) {
            prompt.push_str(&format!(
                "- [{}] {}\n",
                task.kind.tag(),
                summarize(&task.command)
            ));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!("Classify this message: {message}"));
    prompt
}

fn summarize(command: &str) -> &str {
    let end = command
        .char_indices()
        .nth(80)
        .map(|(i, _)| i)
        .unwrap_or(command.len());
    &command[..end]
}

static EMBEDDED_JSON: OnceLock<Regex> = OnceLock::new();

/// Parse the model reply. Strict JSON first; otherwise rescue the first
/// embedded `{...}` block (models love markdown fences and preambles).
pub(crate) fn parse_classification(reply: &str) -> Result<Classification, ClassifyError> {
    let trimmed = reply.trim();
    if let Ok(classification) = serde_json::from_str::<Classification>(trimmed) {
        return Ok(classification);
    }

    let re = EMBEDDED_JSON.get_or_init(|| {
        Regex::new(r"\{[\s\S]*\}").expect("embedded-JSON pattern must compile")
    });
    let Some(m) = re.find(trimmed) else {
        return Err(ClassifyError::BadResponse(truncate_for_error(trimmed)));
    };

    serde_json::from_str::<Classification>(m.as_str()).map_err(|e| {
        if e.to_string().contains("task_type") {
            ClassifyError::MissingTaskType
        } else {
            ClassifyError::BadResponse(truncate_for_error(trimmed))
        }
    })
}

fn truncate_for_error(reply: &str) -> String {
    let end = reply
        .char_indices()
        .nth(120)
        .map(|(i, _)| i)
        .unwrap_or(reply.len());
    reply[..end].to_string()
}
