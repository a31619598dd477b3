//! Agent persona profile and channel credentials.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of recent tasks embedded as conversational context.
pub const DEFAULT_MEMORY_WINDOW: usize = 5;

/// Credentials for a per-agent Twitter client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterCredentials {
    /// OAuth 2.0 user-context bearer token.
    pub bearer_token: String,
}

/// Credentials for a per-agent Telegram bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramCredentials {
    /// Bot API token from @BotFather.
    pub bot_token: String,
}

/// An AI agent persona that receives messages and owns tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: Uuid,
    pub name: String,
    /// The agent's own OpenAI credential, used to backfill image-generation
    /// tasks when the classifier omits a key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    /// How many recent task summaries to embed in the classification prompt.
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<TwitterCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramCredentials>,
}

fn default_memory_window() -> usize {
    DEFAULT_MEMORY_WINDOW
}

impl AgentProfile {
    /// Create a profile with defaults and no channel credentials.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            openai_api_key: None,
            memory_window: DEFAULT_MEMORY_WINDOW,
            twitter: None,
            telegram: None,
        }
    }
}
