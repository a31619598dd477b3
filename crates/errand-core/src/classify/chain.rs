//! Two-stage classifier composition with deterministic fallback.
//!
//! Stage order: fast-path chat table (no I/O), LLM classifier, keyword
//! classifier. The chain never fails and never returns a malformed verdict;
//! the worst outcome of a model outage is a keyword-grade classification.

use errand_types::agent::AgentProfile;
use errand_types::classify::Classification;
use errand_types::task::Task;

use crate::llm::completion::CompletionClient;

use super::chat_patterns;
use super::keyword::KeywordClassifier;
use super::llm::LlmClassifier;

/// Primary LLM classifier with an always-available deterministic fallback.
pub struct ClassifierChain<C: CompletionClient> {
    primary: LlmClassifier<C>,
    fallback: KeywordClassifier,
}

impl<C: CompletionClient> ClassifierChain<C> {
    pub fn new(client: C) -> Self {
        Self {
            primary: LlmClassifier::new(client),
            fallback: KeywordClassifier::new(),
        }
    }

    /// The deterministic fallback stage, exposed for callers that need a
    /// forced non-chat reading (worthiness override in intake).
    pub fn fallback(&self) -> &KeywordClassifier {
        &self.fallback
    }

    /// Classify a message. Infallible by construction.
    pub async fn classify(
        &self,
        message: &str,
        agent: &AgentProfile,
        recent_tasks: &[Task],
    ) -> Classification {
        if chat_patterns::is_canonical_chat(message) {
            return Classification::chat();
        }

        match self.primary.classify(message, agent, recent_tasks).await {
            Ok(classification) => classification,
            Err(err) => {
                tracing::warn!(
                    agent = agent.name.as_str(),
                    error = %err,
                    "model classification failed, using keyword fallback"
                );
                self.fallback.classify(message, agent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockCompletionClient;
    use errand_types::classify::TaskTypeTag;

    fn agent() -> AgentProfile {
        let mut agent = AgentProfile::new("luna");
        agent.openai_api_key = Some("sk-agent".to_string());
        agent
    }

    #[tokio::test]
    async fn fast_path_chat_makes_no_model_call() {
        let client = MockCompletionClient::replying(r#"{"task_type":"chat"}"#);
        let calls = client.calls();
        let chain = ClassifierChain::new(client);

        for msg in ["hi", "thanks!", "who are you?", "???"] {
            let c = chain.classify(msg, &agent(), &[]).await;
            assert!(c.is_chat(), "msg: {msg}");
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_verdict_is_used_when_parseable() {
        let client = MockCompletionClient::replying(
            r#"{"task_type":"api_call","service_name":"image_generation","request_data":{"prompt":"Generate image of a sunset"}}"#,
        );
        let calls = client.calls();
        let chain = ClassifierChain::new(client);

        let c = chain
            .classify("Generate image of a sunset", &agent(), &[])
            .await;
        assert_eq!(c.kind, TaskTypeTag::ApiCall);
        assert_eq!(c.service_name.as_deref(), Some("image_generation"));
        assert_eq!(c.request_data.unwrap()["prompt"], "Generate image of a sunset");
        assert_eq!(c.api_key.as_deref(), Some("sk-agent"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_keywords() {
        let client = MockCompletionClient::failing("provider is down");
        let chain = ClassifierChain::new(client);

        let c = chain
            .classify("Generate image of a sunset", &agent(), &[])
            .await;
        assert_eq!(c.kind, TaskTypeTag::ApiCall);
        assert_eq!(c.service_name.as_deref(), Some("image_generation"));
        assert_eq!(c.api_key.as_deref(), Some("sk-agent"));
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back_to_keywords() {
        let client = MockCompletionClient::replying("I'd rather not say.");
        let chain = ClassifierChain::new(client);

        let c = chain.classify("send 2 SOL to my wallet", &agent(), &[]).await;
        assert_eq!(c.kind, TaskTypeTag::BlockchainTx);
    }

    #[tokio::test]
    async fn fallback_defaults_to_chat_for_plain_talk() {
        let client = MockCompletionClient::failing("down");
        let chain = ClassifierChain::new(client);

        let c = chain.classify("I watched a movie yesterday", &agent(), &[]).await;
        assert!(c.is_chat());
    }
}
