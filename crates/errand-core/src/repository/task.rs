//! Task repository trait definition.
//!
//! Defines the storage interface for tasks. The infrastructure layer
//! (errand-infra) implements this trait with SQLite persistence; tests use
//! an in-memory fake. The store is the single source of truth shared by the
//! processor and monitor loops; all mutations are last-writer-wins field
//! updates except `claim_pending`, which is a conditional flip.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use chrono::{DateTime, Utc};
use errand_types::error::RepositoryError;
use errand_types::task::{RequesterId, Task, TaskStatus};

/// Repository trait for task persistence.
pub trait TaskRepository: Send + Sync {
    /// Insert a new task record.
    fn save(
        &self,
        task: &Task,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a task by id.
    fn get(
        &self,
        task_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Task>, RepositoryError>> + Send;

    /// Atomically flip a task from `Pending` to `InProgress`.
    ///
    /// Returns `true` when this caller won the claim; `false` when the task
    /// was no longer pending (another poller got there first). This is the
    /// only guarded write in the contract.
    fn claim_pending(
        &self,
        task_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Unconditional status update (last-writer-wins).
    fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Record a successful execution: status `Completed`, result,
    /// completion time, response echoed into the service record, and
    /// `notified` reset to false.
    fn record_success(
        &self,
        task_id: &str,
        result: Option<&str>,
        response_data: Option<&serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Record a failed attempt: the error goes into `result` and the
    /// service record, `retries` is set to the given count, status to the
    /// given value (`Pending` for a requeue, `Failed` when settled), and
    /// `notified` reset to false.
    fn record_failure(
        &self,
        task_id: &str,
        error: &str,
        retries: u32,
        status: TaskStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Set the monotonic `notified` flag.
    fn mark_notified(
        &self,
        task_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Tasks with status `Pending`, oldest first.
    fn list_pending(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// Terminal tasks (`Completed`/`Failed`) not yet notified, oldest first.
    fn list_unnotified_terminal(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// Non-terminal tasks (`Pending`/`InProgress`/`AwaitingExternal`),
    /// oldest first. The monitor uses this for SLA enforcement.
    fn list_active(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// Recent tasks for a requester, newest first, limited. Feeds the
    /// classification prompt's memory window.
    fn recent_for_requester(
        &self,
        requester: &RequesterId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// How many tasks a requester created since the given instant.
    /// Feeds the daily task limit.
    fn count_for_requester_since(
        &self,
        requester: &RequesterId,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
