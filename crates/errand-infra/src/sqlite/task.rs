//! SQLite task repository implementation.
//!
//! Implements `TaskRepository` from `errand-core` using sqlx with split
//! read/write pools. The classified kind (including the external service
//! record) is stored as a JSON blob; status, notified, and requester live
//! in indexed columns for the two polling queries.

use chrono::{DateTime, Utc};
use errand_core::repository::task::TaskRepository;
use errand_types::error::RepositoryError;
use errand_types::task::{Channel, RequesterId, ServiceCallStatus, Task, TaskKind, TaskStatus};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TaskRepository`.
pub struct SqliteTaskRepository {
    pool: DatabasePool,
}

impl SqliteTaskRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, task_id: &str) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM tasks WHERE task_id = ?"))
            .bind(task_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = TaskRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_task()?))
            }
            None => Ok(None),
        }
    }

    /// Write back the JSON kind blob together with outcome fields.
    async fn store_outcome(&self, task: &Task) -> Result<(), RepositoryError> {
        let kind_json = serialize_kind(&task.kind)?;
        sqlx::query(
            r#"UPDATE tasks
               SET kind = ?, status = ?, result = ?, completed_at = ?, retries = ?, notified = ?
               WHERE task_id = ?"#,
        )
        .bind(&kind_json)
        .bind(task.status.as_str())
        .bind(&task.result)
        .bind(task.completed_at.as_ref().map(format_datetime))
        .bind(task.retries as i64)
        .bind(task.notified)
        .bind(&task.task_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

const COLUMNS: &str = "task_id, channel_id, channel_user_id, requester_type, requester_id, \
                       agent_id, command, kind, status, created_at, completed_at, retries, \
                       max_retries, notified, result";

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct TaskRow {
    task_id: String,
    channel_id: String,
    channel_user_id: String,
    requester_type: String,
    requester_id: String,
    agent_id: String,
    command: String,
    kind: String,
    status: String,
    created_at: String,
    completed_at: Option<String>,
    retries: i64,
    max_retries: i64,
    notified: bool,
    result: Option<String>,
}

impl TaskRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            task_id: row.try_get("task_id")?,
            channel_id: row.try_get("channel_id")?,
            channel_user_id: row.try_get("channel_user_id")?,
            requester_type: row.try_get("requester_type")?,
            requester_id: row.try_get("requester_id")?,
            agent_id: row.try_get("agent_id")?,
            command: row.try_get("command")?,
            kind: row.try_get("kind")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
            retries: row.try_get("retries")?,
            max_retries: row.try_get("max_retries")?,
            notified: row.try_get("notified")?,
            result: row.try_get("result")?,
        })
    }

    fn into_task(self) -> Result<Task, RepositoryError> {
        let channel: Channel = self
            .channel_id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid channel_id: {e}")))?;
        let requester = match self.requester_type.as_str() {
            "unified" => RequesterId::Unified(self.requester_id),
            "temporary" => RequesterId::Temporary(self.requester_id),
            other => {
                return Err(RepositoryError::Query(format!(
                    "invalid requester_type: '{other}'"
                )));
            }
        };
        let agent_id = parse_uuid(&self.agent_id)?;
        let kind: TaskKind = serde_json::from_str(&self.kind)
            .map_err(|e| RepositoryError::Query(format!("invalid task kind JSON: {e}")))?;
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid status: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;
        let completed_at = self.completed_at.as_deref().map(parse_datetime).transpose()?;

        Ok(Task {
            task_id: self.task_id,
            channel,
            channel_user_id: self.channel_user_id,
            requester,
            agent_id,
            command: self.command,
            kind,
            status,
            created_at,
            completed_at,
            retries: self.retries as u32,
            max_retries: self.max_retries as u32,
            notified: self.notified,
            result: self.result,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn requester_parts(requester: &RequesterId) -> (&'static str, &str) {
    match requester {
        RequesterId::Unified(id) => ("unified", id),
        RequesterId::Temporary(id) => ("temporary", id),
    }
}

fn serialize_kind(kind: &TaskKind) -> Result<String, RepositoryError> {
    serde_json::to_string(kind)
        .map_err(|e| RepositoryError::Query(format!("serialize task kind: {e}")))
}

async fn rows_for(
    pool: &DatabasePool,
    query: &str,
    limit: u32,
) -> Result<Vec<Task>, RepositoryError> {
    let rows = sqlx::query(query)
        .bind(limit as i64)
        .fetch_all(&pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    let mut tasks = Vec::with_capacity(rows.len());
    for row in &rows {
        let r = TaskRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        tasks.push(r.into_task()?);
    }
    Ok(tasks)
}

// ---------------------------------------------------------------------------
// TaskRepository impl
// ---------------------------------------------------------------------------

impl TaskRepository for SqliteTaskRepository {
    async fn save(&self, task: &Task) -> Result<(), RepositoryError> {
        let kind_json = serialize_kind(&task.kind)?;
        let (requester_type, requester_id) = requester_parts(&task.requester);

        sqlx::query(
            r#"INSERT INTO tasks
               (task_id, channel_id, channel_user_id, requester_type, requester_id,
                agent_id, command, kind, status, created_at, completed_at, retries,
                max_retries, notified, result)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&task.task_id)
        .bind(task.channel.to_string())
        .bind(&task.channel_user_id)
        .bind(requester_type)
        .bind(requester_id)
        .bind(task.agent_id.to_string())
        .bind(&task.command)
        .bind(&kind_json)
        .bind(task.status.as_str())
        .bind(format_datetime(&task.created_at))
        .bind(task.completed_at.as_ref().map(format_datetime))
        .bind(task.retries as i64)
        .bind(task.max_retries as i64)
        .bind(task.notified)
        .bind(&task.result)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, RepositoryError> {
        self.fetch(task_id).await
    }

    async fn claim_pending(&self, task_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'in_progress' WHERE task_id = ? AND status = 'pending'",
        )
        .bind(task_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tasks SET status = ? WHERE task_id = ?")
            .bind(status.as_str())
            .bind(task_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn record_success(
        &self,
        task_id: &str,
        result: Option<&str>,
        response_data: Option<&serde_json::Value>,
    ) -> Result<(), RepositoryError> {
        let mut task = self
            .fetch(task_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(task_id.to_string()))?;

        task.status = TaskStatus::Completed;
        task.result = result.map(str::to_string);
        task.completed_at = Some(Utc::now());
        task.notified = false;
        if let Some(svc) = task.kind.external_service_mut() {
            svc.response_data = response_data.cloned();
            svc.status = Some(ServiceCallStatus::Success);
            svc.error = None;
        }

        self.store_outcome(&task).await
    }

    async fn record_failure(
        &self,
        task_id: &str,
        error: &str,
        retries: u32,
        status: TaskStatus,
    ) -> Result<(), RepositoryError> {
        let mut task = self
            .fetch(task_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(task_id.to_string()))?;

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

        self.store_outcome(&task).await
    }

    async fn mark_notified(&self, task_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tasks SET notified = 1 WHERE task_id = ?")
            .bind(task_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<Task>, RepositoryError> {
        rows_for(
            &self.pool,
            &format!(
                "SELECT {COLUMNS} FROM tasks WHERE status = 'pending' ORDER BY created_at ASC LIMIT ?"
            ),
            limit,
        )
        .await
    }

    async fn list_unnotified_terminal(&self, limit: u32) -> Result<Vec<Task>, RepositoryError> {
        rows_for(
            &self.pool,
            &format!(
                "SELECT {COLUMNS} FROM tasks WHERE status IN ('completed', 'failed') AND notified = 0 ORDER BY created_at ASC LIMIT ?"
            ),
            limit,
        )
        .await
    }

    async fn list_active(&self, limit: u32) -> Result<Vec<Task>, RepositoryError> {
        rows_for(
            &self.pool,
            &format!(
                "SELECT {COLUMNS} FROM tasks WHERE status IN ('pending', 'in_progress', 'awaiting_external') ORDER BY created_at ASC LIMIT ?"
            ),
            limit,
        )
        .await
    }

    async fn recent_for_requester(
        &self,
        requester: &RequesterId,
        limit: u32,
    ) -> Result<Vec<Task>, RepositoryError> {
        let (requester_type, requester_id) = requester_parts(requester);
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE requester_type = ? AND requester_id = ? ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(requester_type)
        .bind(requester_id)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = TaskRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            tasks.push(r.into_task()?);
        }
        Ok(tasks)
    }

    async fn count_for_requester_since(
        &self,
        requester: &RequesterId,
        since: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let (requester_type, requester_id) = requester_parts(requester);
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM tasks WHERE requester_type = ? AND requester_id = ? AND created_at >= ?",
        )
        .bind(requester_type)
        .bind(requester_id)
        .bind(format_datetime(&since))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let n: i64 = row
            .try_get("n")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(n as u64)
    }
}
