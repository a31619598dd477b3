//! Live channel-client factory.
//!
//! Builds Twitter/Telegram clients from an agent's stored credentials; the
//! registry in errand-core caches what this hands out.

use errand_core::notify::channel::NotifierFactory;
use errand_types::agent::AgentProfile;
use errand_types::error::NotifyError;
use secrecy::SecretString;
use std::time::Duration;

use crate::channel::telegram::TelegramBotClient;
use crate::channel::twitter::TwitterApiClient;

/// Factory producing real API clients from agent credentials.
pub struct LiveNotifierFactory {
    /// Shared client for image downloads (media attachments).
    client: reqwest::Client,
}

impl LiveNotifierFactory {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");
        Self { client }
    }
}

impl Default for LiveNotifierFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierFactory for LiveNotifierFactory {
    type Twitter = TwitterApiClient;
    type Telegram = TelegramBotClient;

    fn twitter(&self, agent: &AgentProfile) -> Option<Self::Twitter> {
        let creds = agent.twitter.as_ref()?;
        Some(TwitterApiClient::new(SecretString::from(
            creds.bearer_token.clone(),
        )))
    }

    fn telegram(&self, agent: &AgentProfile) -> Option<Self::Telegram> {
        let creds = agent.telegram.as_ref()?;
        Some(TelegramBotClient::new(SecretString::from(
            creds.bot_token.clone(),
        )))
    }

    async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String), NotifyError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NotifyError::ImageFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::ImageFetch(format!("status {status} for {url}")));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| NotifyError::ImageFetch(e.to_string()))?;

        Ok((bytes.to_vec(), mime))
    }
}
