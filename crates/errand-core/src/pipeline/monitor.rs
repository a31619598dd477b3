//! Task monitor: SLA enforcement and one-time outcome notification.
//!
//! The second polling loop. It force-fails tasks that outlive the age SLA
//! and delivers exactly one notification per resolved task, routed by the
//! task's originating channel. Delivery failures degrade to a best-effort
//! fallback message; nothing in here escapes a tick.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use errand_types::agent::AgentProfile;
use errand_types::config::PipelineConfig;
use errand_types::error::{NotifyError, RepositoryError};
use errand_types::event::TaskEvent;
use errand_types::task::{Channel, Task, TaskStatus};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::bus::EventBus;
use crate::external::image::is_image_url;
use crate::notify::channel::{NotifierFactory, TelegramClient, TwitterClient};
use crate::notify::compose;
use crate::notify::registry::NotifierRegistry;
use crate::repository::task::TaskRepository;

/// The monitoring/notification loop.
pub struct TaskMonitor<R, F: NotifierFactory> {
    repo: Arc<R>,
    registry: Arc<NotifierRegistry<F>>,
    agents: HashMap<Uuid, AgentProfile>,
    bus: EventBus,
    config: PipelineConfig,
}

impl<R: TaskRepository, F: NotifierFactory> TaskMonitor<R, F> {
    pub fn new(
        repo: Arc<R>,
        registry: Arc<NotifierRegistry<F>>,
        agents: HashMap<Uuid, AgentProfile>,
        bus: EventBus,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repo,
            registry,
            agents,
            bus,
            config,
        }
    }

    /// Drive the polling loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = std::time::Duration::from_secs(self.config.monitor_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.config.monitor_interval_secs, "task monitor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("task monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once().await {
                        tracing::error!(error = %err, "monitor poll failed");
                    }
                }
            }
        }
    }

    /// One poll pass: enforce the age SLA, then notify resolved tasks.
    /// Exposed for deterministic tests.
    pub async fn run_once(&self) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let max_age = chrono::Duration::seconds(self.config.task_max_age_secs as i64);

        for task in self.repo.list_active(self.config.poll_batch).await? {
            if task.age(now) <= max_age {
                continue;
            }
            tracing::warn!(
                task_id = task.task_id.as_str(),
                age_secs = task.age(now).num_seconds(),
                "task exceeded age SLA"
            );
            self.repo
                .record_failure(&task.task_id, "Task timed out", task.retries, TaskStatus::Failed)
                .await?;
            self.bus.publish(TaskEvent::TaskTimedOut {
                task_id: task.task_id.clone(),
            });
            // Re-read so the notification sees the settled state.
            if let Some(updated) = self.repo.get(&task.task_id).await? {
                self.notify_task(&updated).await?;
            }
        }

        for task in self
            .repo
            .list_unnotified_terminal(self.config.poll_batch)
            .await?
        {
            self.notify_task(&task).await?;
        }

        Ok(())
    }

    /// Deliver the one-time outcome notification for a resolved task.
    async fn notify_task(&self, task: &Task) -> Result<(), RepositoryError> {
        // A completed image task whose stored result is not an image URL
        // cannot be delivered; tell the user and settle it as failed. The
        // notice follows the same delivery policy as any other outcome:
        // the task stays unnotified until a send lands.
        if task.status == TaskStatus::Completed
            && task.kind.is_image_generation()
            && !task.result.as_deref().is_some_and(is_image_url)
        {
            self.repo
                .record_failure(&task.task_id, "Invalid image URL", task.retries, TaskStatus::Failed)
                .await?;
            self.deliver_or_fallback(task, compose::invalid_image_text())
                .await?;
            return Ok(());
        }

        let message = compose::outcome_text(task);
        let image_url = compose::image_attachment(task).map(str::to_string);

        match self.dispatch(task, &message, image_url.as_deref()).await {
            Ok(()) => {
                self.repo.mark_notified(&task.task_id).await?;
                tracing::info!(
                    task_id = task.task_id.as_str(),
                    channel = %task.channel,
                    "outcome notification delivered"
                );
                self.bus.publish(TaskEvent::TaskNotified {
                    task_id: task.task_id.clone(),
                    channel_id: task.channel.to_string(),
                    message,
                    image_url,
                });
            }
            Err(err) => {
                tracing::warn!(
                    task_id = task.task_id.as_str(),
                    error = %err,
                    "notification dispatch failed"
                );
                self.repo
                    .record_failure(
                        &task.task_id,
                        "Notification error",
                        task.retries,
                        TaskStatus::Failed,
                    )
                    .await?;
                // Best effort; a second failure is logged and the task is
                // retried on a later tick.
                match self.dispatch(task, compose::fallback_text(), None).await {
                    Ok(()) => self.repo.mark_notified(&task.task_id).await?,
                    Err(err) => tracing::error!(
                        task_id = task.task_id.as_str(),
                        error = %err,
                        "fallback notification failed"
                    ),
                }
            }
        }
        Ok(())
    }

    /// Send `text`, degrading to the generic fallback message when the
    /// dispatch fails. The task is marked notified only once a send lands;
    /// an unmarked task is picked up again on a later tick.
    async fn deliver_or_fallback(&self, task: &Task, text: &str) -> Result<(), RepositoryError> {
        match self.dispatch(task, text, None).await {
            Ok(()) => self.repo.mark_notified(&task.task_id).await,
            Err(err) => {
                tracing::warn!(
                    task_id = task.task_id.as_str(),
                    error = %err,
                    "notification dispatch failed"
                );
                match self.dispatch(task, compose::fallback_text(), None).await {
                    Ok(()) => self.repo.mark_notified(&task.task_id).await,
                    Err(err) => {
                        tracing::error!(
                            task_id = task.task_id.as_str(),
                            error = %err,
                            "fallback notification failed"
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    /// Route a message to the task's originating channel.
    async fn dispatch(
        &self,
        task: &Task,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<(), NotifyError> {
        match &task.channel {
            Channel::Web => {
                // Web outcomes ride the event bus; the session layer
                // forwards them to connected clients.
                Ok(())
            }
            Channel::Twitter { tweet_id } => {
                let agent = self.agent_for(task, "twitter")?;
                let client = self
                    .registry
                    .twitter_for(agent)
                    .ok_or_else(|| NotifyError::ChannelUnavailable("twitter".to_string()))?;

                let username = client.lookup_username(&task.channel_user_id).await?;
                let media_id = match image_url {
                    Some(url) => {
                        let (bytes, mime) = self.registry.factory().fetch_image(url).await?;
                        Some(client.upload_media(&bytes, &mime).await?)
                    }
                    None => None,
                };
                let reply = compose::twitter_reply(&username, text);
                client
                    .tweet(&reply, Some(tweet_id), media_id.as_deref())
                    .await
            }
            Channel::Telegram { chat_id } => {
                let agent = self.agent_for(task, "telegram")?;
                let client = self
                    .registry
                    .telegram_for(agent)
                    .ok_or_else(|| NotifyError::ChannelUnavailable("telegram".to_string()))?;

                match image_url {
                    Some(url) => client.send_photo(*chat_id, url, text).await,
                    None => client.send_message(*chat_id, text).await,
                }
            }
        }
    }

    fn agent_for(&self, task: &Task, channel: &str) -> Result<&AgentProfile, NotifyError> {
        self.agents
            .get(&task.agent_id)
            .ok_or_else(|| NotifyError::ChannelUnavailable(channel.to_string()))
    }
}
