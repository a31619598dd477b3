//! In-memory fakes shared across pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use errand_types::agent::AgentProfile;
use errand_types::error::{CompletionError, NotifyError, RepositoryError, ServiceError};
use errand_types::task::{RequesterId, ServiceCallStatus, Task, TaskStatus};
use serde_json::Value;

use crate::external::handler::ExternalServiceHandler;
use crate::llm::completion::CompletionClient;
use crate::notify::channel::{NotifierFactory, TelegramClient, TwitterClient};
use crate::repository::task::TaskRepository;

// ---------------------------------------------------------------------------
// Completion client
// ---------------------------------------------------------------------------

/// Completion client returning a canned reply (or error) and counting calls.
pub(crate) struct MockCompletionClient {
    reply: Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl MockCompletionClient {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, usable after the client is moved.
    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _temperature: f32,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(CompletionError::Provider)
    }
}

// ---------------------------------------------------------------------------
// Task repository
// ---------------------------------------------------------------------------

/// Mutex-guarded in-memory task store preserving insertion order.
#[derive(Default)]
pub(crate) struct InMemoryTaskRepository {
    tasks: Mutex<Vec<Task>>,
}

impl InMemoryTaskRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// A copy of the stored task, for assertions.
    pub(crate) fn snapshot(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.task_id == task_id)
            .cloned()
    }

    fn mutate(
        &self,
        task_id: &str,
        apply: impl FnOnce(&mut Task),
    ) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| RepositoryError::NotFound(task_id.to_string()))?;
        apply(task);
        Ok(())
    }
}

impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, task: &Task) -> Result<(), RepositoryError> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, RepositoryError> {
        Ok(self.snapshot(task_id))
    }

    async fn claim_pending(&self, task_id: &str) -> Result<bool, RepositoryError> {
        let mut claimed = false;
        self.mutate(task_id, |task| {
            if task.status == TaskStatus::Pending {
                task.status = TaskStatus::InProgress;
                claimed = true;
            }
        })?;
        Ok(claimed)
    }

    async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), RepositoryError> {
        self.mutate(task_id, |task| task.status = status)
    }

    async fn record_success(
        &self,
        task_id: &str,
        result: Option<&str>,
        response_data: Option<&Value>,
    ) -> Result<(), RepositoryError> {
        self.mutate(task_id, |task| {
            task.status = TaskStatus::Completed;
            task.result = result.map(str::to_string);
            task.completed_at = Some(Utc::now());
            task.notified = false;
            if let Some(svc) = task.kind.external_service_mut() {
                svc.response_data = response_data.cloned();
                svc.status = Some(ServiceCallStatus::Success);
                svc.error = None;
            }
        })
    }

    async fn record_failure(
        &self,
        task_id: &str,
        error: &str,
        retries: u32,
        status: TaskStatus,
    ) -> Result<(), RepositoryError> {
        self.mutate(task_id, |task| {
            task.status = status;
            task.result = Some(error.to_string());
            task.retries = retries;
            task.notified = false;
            if status == TaskStatus::Failed {
                task.completed_at = Some(Utc::now());
            }
            if let Some(svc) = task.kind.external_service_mut() {
                svc.error = Some(error.to_string());
                svc.status = Some(ServiceCallStatus::Error);
            }
        })
    }

    async fn mark_notified(&self, task_id: &str) -> Result<(), RepositoryError> {
        self.mutate(task_id, |task| task.notified = true)
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_unnotified_terminal(&self, limit: u32) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.status.is_terminal() && !t.notified)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_active(&self, limit: u32) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.status.is_terminal())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn recent_for_requester(
        &self,
        requester: &RequesterId,
        limit: u32,
    ) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|t| &t.requester == requester)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_for_requester_since(
        &self,
        requester: &RequesterId,
        since: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.requester == requester && t.created_at >= since)
            .count() as u64)
    }
}

// ---------------------------------------------------------------------------
// External service handler
// ---------------------------------------------------------------------------

/// Handler replaying a script of outcomes, then a fixed fallback outcome.
pub(crate) struct MockServiceHandler {
    script: Mutex<VecDeque<Result<Value, String>>>,
    fallback: Result<Value, String>,
    pub(crate) calls: Arc<AtomicUsize>,
}

impl MockServiceHandler {
    pub(crate) fn succeeding(value: Value) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(value),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(error: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err(error.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replay `script` outcomes in order, then keep returning `fallback`.
    pub(crate) fn scripted(script: Vec<Result<Value, String>>, fallback: Result<Value, String>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ExternalServiceHandler for MockServiceHandler {
    async fn process(&self, _task: &Task) -> Result<Value, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(ServiceError::Http)
    }
}

// ---------------------------------------------------------------------------
// Channel clients and factory
// ---------------------------------------------------------------------------

/// Twitter client recording every call; can be told to fail upcoming tweets.
#[derive(Clone, Default)]
pub(crate) struct RecordingTwitterClient {
    pub(crate) tweets: Arc<Mutex<Vec<(String, Option<String>, Option<String>)>>>,
    pub(crate) uploads: Arc<Mutex<Vec<String>>>,
    pub(crate) fail_next_tweets: Arc<AtomicUsize>,
}

impl TwitterClient for RecordingTwitterClient {
    async fn lookup_username(&self, user_id: &str) -> Result<String, NotifyError> {
        Ok(format!("user_{user_id}"))
    }

    async fn tweet(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        if self
            .fail_next_tweets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(NotifyError::Twitter("injected tweet failure".to_string()));
        }
        self.tweets.lock().unwrap().push((
            text.to_string(),
            reply_to.map(str::to_string),
            media_id.map(str::to_string),
        ));
        Ok(())
    }

    async fn upload_media(&self, _bytes: &[u8], mime: &str) -> Result<String, NotifyError> {
        self.uploads.lock().unwrap().push(mime.to_string());
        Ok(format!("media-{}", self.uploads.lock().unwrap().len()))
    }
}

/// Telegram client recording every call; can be told to fail upcoming sends.
#[derive(Clone, Default)]
pub(crate) struct RecordingTelegramClient {
    pub(crate) messages: Arc<Mutex<Vec<(i64, String)>>>,
    pub(crate) photos: Arc<Mutex<Vec<(i64, String, String)>>>,
    pub(crate) fail_next_sends: Arc<AtomicUsize>,
}

impl RecordingTelegramClient {
    fn take_failure(&self) -> bool {
        self.fail_next_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl TelegramClient for RecordingTelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        if self.take_failure() {
            return Err(NotifyError::Telegram("injected send failure".to_string()));
        }
        self.messages.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), NotifyError> {
        if self.take_failure() {
            return Err(NotifyError::Telegram("injected send failure".to_string()));
        }
        self.photos
            .lock()
            .unwrap()
            .push((chat_id, photo_url.to_string(), caption.to_string()));
        Ok(())
    }
}

/// Factory handing out clones of shared recording clients and counting
/// how many clients it built.
pub(crate) struct CountingNotifierFactory {
    pub(crate) built: Arc<AtomicUsize>,
    pub(crate) twitter: RecordingTwitterClient,
    pub(crate) telegram: RecordingTelegramClient,
    /// Bytes returned by `fetch_image`; `None` makes the fetch fail.
    pub(crate) image_bytes: Option<Vec<u8>>,
}

impl Default for CountingNotifierFactory {
    fn default() -> Self {
        Self {
            built: Arc::new(AtomicUsize::new(0)),
            twitter: RecordingTwitterClient::default(),
            telegram: RecordingTelegramClient::default(),
            image_bytes: Some(vec![0x89, b'P', b'N', b'G']),
        }
    }
}

impl NotifierFactory for CountingNotifierFactory {
    type Twitter = RecordingTwitterClient;
    type Telegram = RecordingTelegramClient;

    fn twitter(&self, agent: &AgentProfile) -> Option<Self::Twitter> {
        agent.twitter.as_ref()?;
        self.built.fetch_add(1, Ordering::SeqCst);
        Some(self.twitter.clone())
    }

    fn telegram(&self, agent: &AgentProfile) -> Option<Self::Telegram> {
        agent.telegram.as_ref()?;
        self.built.fetch_add(1, Ordering::SeqCst);
        Some(self.telegram.clone())
    }

    async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String), NotifyError> {
        match &self.image_bytes {
            Some(bytes) => Ok((bytes.clone(), "image/png".to_string())),
            None => Err(NotifyError::ImageFetch(url.to_string())),
        }
    }
}
