//! Telegram Bot API client for outcome messages.
//!
//! The bot token is part of every request URL, so it is wrapped in
//! [`secrecy::SecretString`] and only exposed when building the request.

use std::time::Duration;

use errand_core::notify::channel::TelegramClient;
use errand_types::error::NotifyError;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

/// Telegram bot client scoped to one agent's credentials.
pub struct TelegramBotClient {
    client: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl TelegramBotClient {
    pub fn new(bot_token: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            bot_token,
            base_url: "https://api.telegram.org".to_string(),
        }
    }

    /// Override the API host (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn call(&self, method: &str, body: Value) -> Result<(), NotifyError> {
        let url = format!(
            "{}/bot{}/{method}",
            self.base_url,
            self.bot_token.expose_secret()
        );
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Telegram(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Telegram(format!(
                "{method} status {status}: {detail}"
            )));
        }
        Ok(())
    }
}

impl TelegramClient for TelegramBotClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), NotifyError> {
        self.call(
            "sendPhoto",
            json!({ "chat_id": chat_id, "photo": photo_url, "caption": caption }),
        )
        .await
    }
}
