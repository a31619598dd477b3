//! Task domain types for Errand.
//!
//! A `Task` is a unit of asynchronous work derived from a user message that
//! is not simple conversation. Tasks are created by message intake, advanced
//! by the task processor, and resolved to the originating channel by the
//! task monitor. The `TaskKind` tagged union guarantees that external-service
//! fields are only reachable on non-chat variants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// The originating surface of a message, parsed from its wire shape:
/// `"web"`, `"twitter_<tweetId>"`, or a decimal Telegram chat id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Channel {
    /// Browser session; outcomes are delivered over the in-process event bus.
    Web,
    /// A tweet to reply to.
    Twitter { tweet_id: String },
    /// A Telegram chat.
    Telegram { chat_id: i64 },
}

/// Error parsing a channel id string.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized channel id: '{0}'")]
pub struct ChannelParseError(pub String);

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "web" {
            return Ok(Channel::Web);
        }
        if let Some(tweet_id) = s.strip_prefix("twitter_") {
            if tweet_id.is_empty() {
                return Err(ChannelParseError(s.to_string()));
            }
            return Ok(Channel::Twitter {
                tweet_id: tweet_id.to_string(),
            });
        }
        if let Ok(chat_id) = s.parse::<i64>() {
            return Ok(Channel::Telegram { chat_id });
        }
        Err(ChannelParseError(s.to_string()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Web => write!(f, "web"),
            Channel::Twitter { tweet_id } => write!(f, "twitter_{tweet_id}"),
            Channel::Telegram { chat_id } => write!(f, "{chat_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requester identity
// ---------------------------------------------------------------------------

/// The requester's account context. Exactly one of the two identities
/// applies to a task: a registered user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RequesterId {
    /// Registered-user identity.
    Unified(String),
    /// Anonymous-session identity.
    Temporary(String),
}

impl RequesterId {
    /// The raw identity string, regardless of variant.
    pub fn as_str(&self) -> &str {
        match self {
            RequesterId::Unified(id) | RequesterId::Temporary(id) => id,
        }
    }
}

// ---------------------------------------------------------------------------
// Task status and kind
// ---------------------------------------------------------------------------

/// Lifecycle status of a task. Moves forward only:
/// pending -> in_progress -> awaiting_external -> (completed | failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    AwaitingExternal,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Stable string form used for storage and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::AwaitingExternal => "awaiting_external",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "awaiting_external" => Ok(TaskStatus::AwaitingExternal),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("invalid task status: '{other}'")),
        }
    }
}

/// Outcome recorded on an external service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCallStatus {
    Success,
    Error,
}

/// The external integration a non-chat task targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalService {
    /// For api_call tasks: "image_generation" or a request target.
    /// For blockchain_tx tasks: the chain name (e.g. "solana").
    pub service_name: String,
    /// Service-specific parameters (e.g. `{"prompt": ...}` for image
    /// generation, `{method, body, headers}` for generic calls).
    pub request_data: serde_json::Value,
    /// Raw response payload echoed back after execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<serde_json::Value>,
    /// Outcome of the most recent execution attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceCallStatus>,
    /// Error message from the most recent failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Task-level API key override (falls back to the agent's credential).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ExternalService {
    /// Create a service record with only name and parameters set.
    pub fn new(service_name: impl Into<String>, request_data: serde_json::Value) -> Self {
        Self {
            service_name: service_name.into(),
            request_data,
            response_data: None,
            status: None,
            error: None,
            api_key: None,
        }
    }
}

/// What kind of work a task represents.
///
/// Internally tagged by `task_type` to match the classification contract.
/// Chat tasks carry no external service; the variant system makes the
/// service record unreachable for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_type", content = "external_service", rename_all = "snake_case")]
pub enum TaskKind {
    /// Conversational; completes immediately, never invokes a handler.
    Chat,
    /// Image generation or a generic HTTP call.
    ApiCall(ExternalService),
    /// Blockchain transaction.
    BlockchainTx(ExternalService),
    /// MCP action post.
    McpAction(ExternalService),
}

impl TaskKind {
    /// The external service record, when this kind has one.
    pub fn external_service(&self) -> Option<&ExternalService> {
        match self {
            TaskKind::Chat => None,
            TaskKind::ApiCall(svc) | TaskKind::BlockchainTx(svc) | TaskKind::McpAction(svc) => {
                Some(svc)
            }
        }
    }

    /// Mutable access to the external service record, when present.
    pub fn external_service_mut(&mut self) -> Option<&mut ExternalService> {
        match self {
            TaskKind::Chat => None,
            TaskKind::ApiCall(svc) | TaskKind::BlockchainTx(svc) | TaskKind::McpAction(svc) => {
                Some(svc)
            }
        }
    }

    /// Stable tag string ("chat", "api_call", "blockchain_tx", "mcp_action").
    pub fn tag(&self) -> &'static str {
        match self {
            TaskKind::Chat => "chat",
            TaskKind::ApiCall(_) => "api_call",
            TaskKind::BlockchainTx(_) => "blockchain_tx",
            TaskKind::McpAction(_) => "mcp_action",
        }
    }

    /// Whether this is an image-generation api_call.
    pub fn is_image_generation(&self) -> bool {
        matches!(self, TaskKind::ApiCall(svc) if svc.service_name == "image_generation")
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Default maximum execution attempts for a task.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The central entity of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Opaque unique id, caller-generated (the daemon uses UUIDv7 strings).
    pub task_id: String,
    /// Originating channel.
    pub channel: Channel,
    /// Platform-specific sender id.
    pub channel_user_id: String,
    /// Registered or anonymous account context of the requester.
    pub requester: RequesterId,
    /// The agent persona this task belongs to.
    pub agent_id: Uuid,
    /// Original natural-language text of the request.
    pub command: String,
    /// Classified kind, carrying the external service record for non-chat.
    pub kind: TaskKind,
    /// Lifecycle status.
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Failed execution attempts so far.
    pub retries: u32,
    /// Attempt ceiling (default 3).
    pub max_retries: u32,
    /// Whether the outcome notification has been delivered. Monotonic:
    /// false -> true, at most once, only after a terminal status.
    pub notified: bool,
    /// Human-readable result; for image tasks, a URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(
        task_id: impl Into<String>,
        channel: Channel,
        channel_user_id: impl Into<String>,
        requester: RequesterId,
        agent_id: Uuid,
        command: impl Into<String>,
        kind: TaskKind,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            channel,
            channel_user_id: channel_user_id.into(),
            requester,
            agent_id,
            command: command.into(),
            kind,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            retries: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            notified: false,
            result: None,
        }
    }

    /// Wall-clock age of the task.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Whether execution attempts are exhausted.
    pub fn retries_exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trips_wire_shapes() {
        for wire in ["web", "twitter_1234567890", "-10045678", "42"] {
            let channel: Channel = wire.parse().unwrap();
            assert_eq!(channel.to_string(), wire);
        }
    }

    #[test]
    fn channel_parse_rejects_garbage() {
        assert!("twitter_".parse::<Channel>().is_err());
        assert!("discord_99".parse::<Channel>().is_err());
        assert!("".parse::<Channel>().is_err());
    }

    #[test]
    fn telegram_channel_is_numeric() {
        let channel: Channel = "-1001234".parse().unwrap();
        assert_eq!(channel, Channel::Telegram { chat_id: -1001234 });
    }

    #[test]
    fn chat_kind_has_no_service() {
        let kind = TaskKind::Chat;
        assert!(kind.external_service().is_none());
        assert_eq!(kind.tag(), "chat");
    }

    #[test]
    fn image_generation_kind_is_detected() {
        let kind = TaskKind::ApiCall(ExternalService::new(
            "image_generation",
            serde_json::json!({"prompt": "a sunset"}),
        ));
        assert!(kind.is_image_generation());

        let other = TaskKind::ApiCall(ExternalService::new(
            "https://api.example.com",
            serde_json::json!({"method": "GET"}),
        ));
        assert!(!other.is_image_generation());
    }

    #[test]
    fn task_status_round_trips() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::AwaitingExternal,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::AwaitingExternal.is_terminal());
    }

    #[test]
    fn task_kind_serde_uses_task_type_tag() {
        let kind = TaskKind::BlockchainTx(ExternalService::new(
            "solana",
            serde_json::json!({"to": "addr", "amount": 1}),
        ));
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["task_type"], "blockchain_tx");
        assert_eq!(json["external_service"]["service_name"], "solana");

        let chat = serde_json::to_value(TaskKind::Chat).unwrap();
        assert_eq!(chat["task_type"], "chat");
        assert!(chat.get("external_service").is_none());
    }

    #[test]
    fn new_task_defaults() {
        let task = Task::new(
            "t-1",
            Channel::Web,
            "user-1",
            RequesterId::Temporary("anon-1".to_string()),
            Uuid::now_v7(),
            "draw a cat",
            TaskKind::Chat,
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 0);
        assert_eq!(task.max_retries, DEFAULT_MAX_RETRIES);
        assert!(!task.notified);
        assert!(task.result.is_none());
        assert!(!task.retries_exhausted());
    }
}
