use thiserror::Error;

/// Errors from repository operations (used by trait definitions in errand-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("task not found: {0}")]
    NotFound(String),
}

/// Errors from the chat-completion provider used for classification.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("empty completion")]
    EmptyResponse,
}

/// Errors internal to classification. Never escape the classifier chain:
/// the deterministic fallback always produces a verdict.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("unparseable classification response: {0}")]
    BadResponse(String),

    #[error("classification missing task_type")]
    MissingTaskType,
}

/// Errors from external service execution. Recorded on the task and
/// surfaced to the user only as a normalized notification.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("image prompt is required")]
    MissingPrompt,

    #[error("no API key available for image generation")]
    MissingApiKey,

    #[error("Invalid image URL")]
    InvalidImageUrl,

    #[error("unsupported blockchain service: {0}")]
    UnsupportedService(String),

    #[error("Unsupported task type")]
    UnsupportedTaskType,

    #[error("image generation failed: {0}")]
    ImageGeneration(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("mcp endpoint returned status {0}")]
    McpStatus(u16),

    #[error("invalid request_data: {0}")]
    BadRequestData(String),
}

/// Errors delivering a notification to a channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("channel '{0}' is not configured for this agent")]
    ChannelUnavailable(String),

    #[error("twitter api error: {0}")]
    Twitter(String),

    #[error("telegram api error: {0}")]
    Telegram(String),

    #[error("failed to fetch image: {0}")]
    ImageFetch(String),
}
