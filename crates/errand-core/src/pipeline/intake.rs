//! Message intake: decide whether an inbound message becomes a task.
//!
//! Classification and the worthiness filter combine with OR semantics: a
//! message is queued when the classifier reads it as non-chat, or when the
//! filter finds a concrete ask the classifier missed. In the latter case
//! the keyword classifier supplies the task shape.

use std::sync::Arc;

use chrono::{Duration, Utc};
use errand_types::agent::AgentProfile;
use errand_types::classify::{Classification, TaskTypeTag};
use errand_types::config::PipelineConfig;
use errand_types::error::RepositoryError;
use errand_types::event::TaskEvent;
use errand_types::task::{Channel, ExternalService, RequesterId, Task, TaskKind};
use serde_json::Value;
use uuid::Uuid;

use crate::classify::{ClassifierChain, should_save_as_task};
use crate::event::bus::EventBus;
use crate::llm::completion::CompletionClient;
use crate::repository::task::TaskRepository;

/// An inbound user message, already attributed to a channel and requester.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel: Channel,
    pub channel_user_id: String,
    pub requester: RequesterId,
    pub text: String,
}

/// What intake decided to do with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// Conversational; nothing was stored, the agent just replies.
    Chat,
    /// A task was queued; `ack` is the immediate reply to the requester.
    Queued { task_id: String, ack: String },
    /// The requester hit the daily task ceiling.
    RateLimited,
}

/// Intake stage: rate limit, classify, filter, persist, acknowledge.
pub struct Intake<R, C: CompletionClient> {
    repo: Arc<R>,
    classifier: ClassifierChain<C>,
    bus: EventBus,
    config: PipelineConfig,
}

impl<R: TaskRepository, C: CompletionClient> Intake<R, C> {
    pub fn new(
        repo: Arc<R>,
        classifier: ClassifierChain<C>,
        bus: EventBus,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repo,
            classifier,
            bus,
            config,
        }
    }

    /// Handle one inbound message for an agent.
    pub async fn handle(
        &self,
        agent: &AgentProfile,
        message: InboundMessage,
    ) -> Result<IntakeOutcome, RepositoryError> {
        let since = Utc::now() - Duration::hours(24);
        let today = self
            .repo
            .count_for_requester_since(&message.requester, since)
            .await?;
        if today >= self.config.daily_task_limit {
            tracing::warn!(
                requester = message.requester.as_str(),
                today,
                "daily task limit reached"
            );
            return Ok(IntakeOutcome::RateLimited);
        }

        let recent = self
            .repo
            .recent_for_requester(&message.requester, agent.memory_window as u32)
            .await?;
        let mut classification = self
            .classifier
            .classify(&message.text, agent, &recent)
            .await;
        let worthy = should_save_as_task(&message.text);

        if classification.is_chat() {
            if !worthy {
                return Ok(IntakeOutcome::Chat);
            }
            // The filter found a concrete ask the model read as chat.
            // Re-read with the keyword classifier. When even that pass
            // reads chat there is no executable shape to fabricate; the
            // message is queued as a Chat task, which the processor
            // completes on its next tick and the monitor acknowledges.
            classification = self.classifier.fallback().classify(&message.text, agent);
        }

        let task_id = Uuid::now_v7().to_string();
        let mut task = Task::new(
            task_id.clone(),
            message.channel,
            message.channel_user_id,
            message.requester,
            agent.id,
            message.text,
            task_kind(classification),
        );
        task.max_retries = self.config.max_retries;

        self.repo.save(&task).await?;
        self.bus.publish(TaskEvent::TaskQueued {
            task_id: task_id.clone(),
        });
        tracing::info!(
            task_id = task_id.as_str(),
            kind = task.kind.tag(),
            "task queued"
        );

        Ok(IntakeOutcome::Queued {
            task_id,
            ack: "Got it! I'm working on your request and will post the result here."
                .to_string(),
        })
    }
}

/// Build the task kind from a non-chat classification, defaulting the
/// service name and parameters when the classifier left them out.
fn task_kind(classification: Classification) -> TaskKind {
    let request_data = classification.request_data.unwrap_or(Value::Null);
    match classification.kind {
        TaskTypeTag::Chat => TaskKind::Chat,
        TaskTypeTag::ApiCall => {
            let mut svc = ExternalService::new(
                classification
                    .service_name
                    .unwrap_or_else(|| "api_request".to_string()),
                request_data,
            );
            svc.api_key = classification.api_key;
            TaskKind::ApiCall(svc)
        }
        TaskTypeTag::BlockchainTx => TaskKind::BlockchainTx(ExternalService::new(
            classification
                .service_name
                .unwrap_or_else(|| "solana".to_string()),
            request_data,
        )),
        TaskTypeTag::McpAction => TaskKind::McpAction(ExternalService::new(
            classification.service_name.unwrap_or_else(|| "mcp".to_string()),
            request_data,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{InMemoryTaskRepository, MockCompletionClient};
    use errand_types::task::TaskStatus;

    fn agent() -> AgentProfile {
        let mut agent = AgentProfile::new("luna");
        agent.openai_api_key = Some("sk-agent".to_string());
        agent
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            channel: Channel::Web,
            channel_user_id: "u-1".to_string(),
            requester: RequesterId::Temporary("anon-1".to_string()),
            text: text.to_string(),
        }
    }

    fn intake(
        repo: Arc<InMemoryTaskRepository>,
        client: MockCompletionClient,
        config: PipelineConfig,
    ) -> Intake<InMemoryTaskRepository, MockCompletionClient> {
        Intake::new(repo, ClassifierChain::new(client), EventBus::new(16), config)
    }

    #[tokio::test]
    async fn small_talk_stays_conversational() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let intake = intake(
            repo.clone(),
            MockCompletionClient::replying(r#"{"task_type":"chat"}"#),
            PipelineConfig::default(),
        );

        let outcome = intake.handle(&agent(), message("hello!")).await.unwrap();
        assert_eq!(outcome, IntakeOutcome::Chat);
        assert!(repo.list_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_request_is_queued_pending() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let intake = Intake::new(
            repo.clone(),
            ClassifierChain::new(MockCompletionClient::replying(
                r#"{"task_type":"api_call","service_name":"image_generation","request_data":{"prompt":"Draw a neon dragon"}}"#,
            )),
            bus,
            PipelineConfig::default(),
        );

        let outcome = intake
            .handle(&agent(), message("Draw a neon dragon"))
            .await
            .unwrap();
        let IntakeOutcome::Queued { task_id, ack } = outcome else {
            panic!("expected a queued task");
        };
        assert!(!ack.is_empty());

        let task = repo.snapshot(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.kind.is_image_generation());
        assert_eq!(
            task.kind.external_service().unwrap().api_key.as_deref(),
            Some("sk-agent")
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            TaskEvent::TaskQueued { .. }
        ));
    }

    #[tokio::test]
    async fn worthy_but_chat_classified_message_becomes_a_task() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        // Model insists the message is chat; the filter disagrees.
        let intake = intake(
            repo.clone(),
            MockCompletionClient::replying(r#"{"task_type":"chat"}"#),
            PipelineConfig::default(),
        );

        let outcome = intake
            .handle(&agent(), message("thanks, now draw a cat"))
            .await
            .unwrap();
        let IntakeOutcome::Queued { task_id, .. } = outcome else {
            panic!("expected a queued task");
        };
        let task = repo.snapshot(&task_id).unwrap();
        assert!(task.kind.is_image_generation());
    }

    #[tokio::test]
    async fn worthy_message_without_keyword_shape_queues_a_chat_task() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        // Model and keyword pass both read chat; the filter still finds a
        // concrete ask.
        let intake = intake(
            repo.clone(),
            MockCompletionClient::replying(r#"{"task_type":"chat"}"#),
            PipelineConfig::default(),
        );

        let outcome = intake
            .handle(&agent(), message("can you summarize what happened here?"))
            .await
            .unwrap();
        let IntakeOutcome::Queued { task_id, .. } = outcome else {
            panic!("expected a queued task");
        };
        // A Chat task completes without touching the service handler.
        let task = repo.snapshot(&task_id).unwrap();
        assert!(matches!(task.kind, TaskKind::Chat));
    }

    #[tokio::test]
    async fn daily_limit_rate_limits() {
        let config = PipelineConfig {
            daily_task_limit: 1,
            ..PipelineConfig::default()
        };
        let repo = Arc::new(InMemoryTaskRepository::new());
        let intake = intake(
            repo.clone(),
            MockCompletionClient::replying(
                r#"{"task_type":"api_call","service_name":"image_generation","request_data":{"prompt":"x"}}"#,
            ),
            config,
        );

        let first = intake.handle(&agent(), message("draw a cat")).await.unwrap();
        assert!(matches!(first, IntakeOutcome::Queued { .. }));

        let second = intake.handle(&agent(), message("draw a dog")).await.unwrap();
        assert_eq!(second, IntakeOutcome::RateLimited);
        assert_eq!(repo.list_pending(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queued_task_carries_configured_retry_ceiling() {
        let config = PipelineConfig {
            max_retries: 7,
            ..PipelineConfig::default()
        };
        let repo = Arc::new(InMemoryTaskRepository::new());
        let intake = intake(
            repo.clone(),
            MockCompletionClient::replying(
                r#"{"task_type":"blockchain_tx","service_name":"solana","request_data":{"amount":1}}"#,
            ),
            config,
        );

        let IntakeOutcome::Queued { task_id, .. } = intake
            .handle(&agent(), message("send 1 SOL to my wallet"))
            .await
            .unwrap()
        else {
            panic!("expected a queued task");
        };
        assert_eq!(repo.snapshot(&task_id).unwrap().max_retries, 7);
    }
}
