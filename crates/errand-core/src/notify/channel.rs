//! Channel client ports.
//!
//! Live implementations (reqwest against the Twitter and Telegram APIs)
//! live in errand-infra; the monitor only sees these traits.

use errand_types::agent::AgentProfile;
use errand_types::error::NotifyError;

/// Twitter operations the notifier needs.
pub trait TwitterClient: Send + Sync {
    /// Resolve a user id to a handle (cached by the implementation).
    fn lookup_username(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<String, NotifyError>> + Send;

    /// Post a tweet, optionally as a reply and with an attached media id.
    fn tweet(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;

    /// Upload media bytes; returns the media id to attach to a tweet.
    fn upload_media(
        &self,
        bytes: &[u8],
        mime: &str,
    ) -> impl std::future::Future<Output = Result<String, NotifyError>> + Send;
}

/// Telegram bot operations the notifier needs.
pub trait TelegramClient: Send + Sync {
    fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;

    /// Send a photo by URL with a caption.
    fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Builds channel clients from an agent's credentials. `None` means the
/// agent has no credentials for that channel.
pub trait NotifierFactory: Send + Sync {
    type Twitter: TwitterClient;
    type Telegram: TelegramClient;

    fn twitter(&self, agent: &AgentProfile) -> Option<Self::Twitter>;

    fn telegram(&self, agent: &AgentProfile) -> Option<Self::Telegram>;

    /// Download image bytes for media upload; returns bytes and mime type.
    fn fetch_image(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(Vec<u8>, String), NotifyError>> + Send;
}
