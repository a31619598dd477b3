//! Task processor: the polling loop that executes pending tasks.
//!
//! Each tick pulls a batch of pending tasks and walks them sequentially;
//! external calls suspend at await points, so ticks interleave with the
//! monitor loop without blocking. One task's failure never aborts the tick.

use std::sync::Arc;

use errand_types::config::PipelineConfig;
use errand_types::error::RepositoryError;
use errand_types::event::TaskEvent;
use errand_types::task::{Task, TaskKind, TaskStatus};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::event::bus::EventBus;
use crate::external::handler::ExternalServiceHandler;
use crate::external::image::is_image_url;
use crate::repository::task::TaskRepository;

/// Recorded when a task is polled with its attempt budget already spent.
const MAX_RETRIES_EXCEEDED: &str = "Max retries exceeded";

/// The pending-task execution loop.
pub struct TaskProcessor<R, H> {
    repo: Arc<R>,
    handler: Arc<H>,
    bus: EventBus,
    config: PipelineConfig,
}

impl<R: TaskRepository, H: ExternalServiceHandler> TaskProcessor<R, H> {
    pub fn new(repo: Arc<R>, handler: Arc<H>, bus: EventBus, config: PipelineConfig) -> Self {
        Self {
            repo,
            handler,
            bus,
            config,
        }
    }

    /// Drive the polling loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = std::time::Duration::from_secs(self.config.processor_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.config.processor_interval_secs, "task processor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("task processor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once().await {
                        tracing::error!(error = %err, "processor poll failed");
                    }
                }
            }
        }
    }

    /// One poll pass. Exposed for deterministic tests.
    pub async fn run_once(&self) -> Result<(), RepositoryError> {
        let pending = self.repo.list_pending(self.config.poll_batch).await?;
        for task in pending {
            if let Err(err) = self.process_task(&task).await {
                // A store error mid-task: settle the task as a failed
                // attempt so the tick survives.
                tracing::error!(
                    task_id = task.task_id.as_str(),
                    error = %err,
                    "task processing errored"
                );
                let _ = self.fail_attempt(&task, &err.to_string()).await;
            }
        }
        Ok(())
    }

    async fn process_task(&self, task: &Task) -> Result<(), RepositoryError> {
        if task.retries_exhausted() {
            self.repo
                .record_failure(
                    &task.task_id,
                    MAX_RETRIES_EXCEEDED,
                    task.retries,
                    TaskStatus::Failed,
                )
                .await?;
            self.bus.publish(TaskEvent::TaskFailed {
                task_id: task.task_id.clone(),
                error: MAX_RETRIES_EXCEEDED.to_string(),
            });
            return Ok(());
        }

        if !self.repo.claim_pending(&task.task_id).await? {
            tracing::debug!(task_id = task.task_id.as_str(), "claim lost, skipping");
            return Ok(());
        }

        // Chat tasks should never be queued; settle them without execution.
        if matches!(task.kind, TaskKind::Chat) {
            self.repo.record_success(&task.task_id, None, None).await?;
            self.bus.publish(TaskEvent::TaskCompleted {
                task_id: task.task_id.clone(),
                result: None,
            });
            return Ok(());
        }

        self.repo
            .update_status(&task.task_id, TaskStatus::AwaitingExternal)
            .await?;

        match self.handler.process(task).await {
            Ok(payload) => {
                if task.kind.is_image_generation() {
                    let url = payload.get("url").and_then(Value::as_str).unwrap_or("");
                    if !is_image_url(url) {
                        tracing::warn!(
                            task_id = task.task_id.as_str(),
                            url,
                            "image generation returned a non-image URL"
                        );
                        return self.fail_attempt(task, "Invalid image URL").await;
                    }
                    self.complete(task, url.to_string(), payload).await
                } else {
                    self.complete(task, render_result(&payload), payload).await
                }
            }
            Err(err) => self.fail_attempt(task, &err.to_string()).await,
        }
    }

    async fn complete(
        &self,
        task: &Task,
        result: String,
        payload: Value,
    ) -> Result<(), RepositoryError> {
        self.repo
            .record_success(&task.task_id, Some(&result), Some(&payload))
            .await?;
        tracing::info!(task_id = task.task_id.as_str(), "task completed");
        self.bus.publish(TaskEvent::TaskCompleted {
            task_id: task.task_id.clone(),
            result: Some(result),
        });
        Ok(())
    }

    /// Record a failed attempt: requeue to pending while attempts remain,
    /// settle as failed once the budget is spent.
    async fn fail_attempt(&self, task: &Task, error: &str) -> Result<(), RepositoryError> {
        let retries = task.retries + 1;
        let status = if retries >= task.max_retries {
            TaskStatus::Failed
        } else {
            TaskStatus::Pending
        };
        self.repo
            .record_failure(&task.task_id, error, retries, status)
            .await?;

        if status == TaskStatus::Failed {
            tracing::warn!(
                task_id = task.task_id.as_str(),
                retries,
                error,
                "task failed"
            );
            self.bus.publish(TaskEvent::TaskFailed {
                task_id: task.task_id.clone(),
                error: error.to_string(),
            });
        } else {
            tracing::warn!(
                task_id = task.task_id.as_str(),
                retries,
                error,
                "attempt failed, task requeued"
            );
        }
        Ok(())
    }
}

/// Human-readable result derived from a response payload.
fn render_result(payload: &Value) -> String {
    if let Some(s) = payload.as_str() {
        return s.to_string();
    }
    if let Some(signature) = payload.get("signature").and_then(Value::as_str) {
        return format!("Transaction submitted: {signature}");
    }
    payload.to_string()
}
