//! Lifecycle events published on the in-process broadcast bus.
//!
//! Web-channel notifications are delivered as `TaskNotified` events; the
//! HTTP/session layer (outside this subsystem) forwards them to connected
//! clients. Other variants exist for observers and tests.

use serde::{Deserialize, Serialize};

/// A task lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    /// A new task was accepted and persisted as pending.
    TaskQueued { task_id: String },
    /// The processor resolved a task successfully.
    TaskCompleted {
        task_id: String,
        result: Option<String>,
    },
    /// The processor (or retry exhaustion) settled a task as failed.
    TaskFailed { task_id: String, error: String },
    /// The monitor force-failed a task past the age SLA.
    TaskTimedOut { task_id: String },
    /// The outcome notification was delivered to the originating channel.
    TaskNotified {
        task_id: String,
        channel_id: String,
        message: String,
        /// Image URL attached to the notification, when the task produced one.
        image_url: Option<String>,
    },
}
