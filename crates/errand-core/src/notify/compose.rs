//! Outcome message composition.

use errand_types::task::{Task, TaskStatus};

/// Twitter's hard length limit; the truncated reply includes the handle.
pub const TWEET_LIMIT: usize = 280;

/// The one-time outcome message for a resolved task.
pub fn outcome_text(task: &Task) -> String {
    match task.status {
        TaskStatus::Completed if task.kind.is_image_generation() => {
            "Image generated successfully!".to_string()
        }
        TaskStatus::Completed => match task.result.as_deref() {
            Some(result) => format!("Task completed: {result}"),
            None => "Task completed.".to_string(),
        },
        _ => format!("Task failed: {}", failure_reason(task)),
    }
}

/// The human-readable failure reason: the stored result, else the service
/// record's error, else a generic phrase.
pub fn failure_reason(task: &Task) -> &str {
    task.result
        .as_deref()
        .or_else(|| {
            task.kind
                .external_service()
                .and_then(|svc| svc.error.as_deref())
        })
        .unwrap_or("unknown error")
}

/// Best-effort message sent when composing or dispatching the real
/// notification failed.
pub fn fallback_text() -> &'static str {
    "Sorry, your task failed to process. Please try again."
}

/// Message sent instead of an image when the stored URL is not usable.
pub fn invalid_image_text() -> &'static str {
    "Sorry, the generated image link was invalid."
}

/// The image URL to attach, when this outcome carries one.
pub fn image_attachment(task: &Task) -> Option<&str> {
    if task.status == TaskStatus::Completed && task.kind.is_image_generation() {
        task.result.as_deref()
    } else {
        None
    }
}

/// Address `username` and fit the whole reply in the tweet limit,
/// truncating the body with an ellipsis when needed.
pub fn twitter_reply(username: &str, text: &str) -> String {
    let full = format!("@{username} {text}");
    if full.chars().count() <= TWEET_LIMIT {
        return full;
    }
    let mut truncated: String = full.chars().take(TWEET_LIMIT - 1).collect();
    truncated.push('…');
    truncated
}
