//! Twitter (X) API client for outcome replies.
//!
//! Tweets and user lookups go to the v2 API; media upload still lives on
//! the v1.1 upload host and takes base64 form data. Usernames are cached
//! in-client so repeated replies to the same author cost one lookup.
//!
//! The bearer token is wrapped in [`secrecy::SecretString`] and never
//! appears in Debug output or logs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use errand_core::notify::channel::TwitterClient;
use errand_types::error::NotifyError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

/// Twitter API client scoped to one agent's credentials.
pub struct TwitterApiClient {
    client: reqwest::Client,
    bearer_token: SecretString,
    api_base: String,
    upload_base: String,
    username_cache: Mutex<HashMap<String, String>>,
}

impl TwitterApiClient {
    pub fn new(bearer_token: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            bearer_token,
            api_base: "https://api.twitter.com".to_string(),
            upload_base: "https://upload.twitter.com".to_string(),
            username_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Override both hosts (useful for testing or proxies).
    pub fn with_base_urls(mut self, api_base: String, upload_base: String) -> Self {
        self.api_base = api_base;
        self.upload_base = upload_base;
        self
    }
}

#[derive(Deserialize)]
struct UserLookupResponse {
    data: UserData,
}

#[derive(Deserialize)]
struct UserData {
    username: String,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

impl TwitterClient for TwitterApiClient {
    async fn lookup_username(&self, user_id: &str) -> Result<String, NotifyError> {
        if let Some(username) = self.username_cache.lock().unwrap().get(user_id) {
            return Ok(username.clone());
        }

        let response = self
            .client
            .get(format!("{}/2/users/{user_id}", self.api_base))
            .bearer_auth(self.bearer_token.expose_secret())
            .send()
            .await
            .map_err(|e| NotifyError::Twitter(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Twitter(format!("user lookup status {status}")));
        }

        let parsed: UserLookupResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Twitter(e.to_string()))?;

        self.username_cache
            .lock()
            .unwrap()
            .insert(user_id.to_string(), parsed.data.username.clone());
        Ok(parsed.data.username)
    }

    async fn tweet(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        let mut body = json!({ "text": text });
        if let Some(tweet_id) = reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": tweet_id });
        }
        if let Some(media_id) = media_id {
            body["media"] = json!({ "media_ids": [media_id] });
        }

        let response = self
            .client
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(self.bearer_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Twitter(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Twitter(format!("tweet status {status}: {detail}")));
        }
        Ok(())
    }

    async fn upload_media(&self, bytes: &[u8], _mime: &str) -> Result<String, NotifyError> {
        let encoded = BASE64.encode(bytes);

        let response = self
            .client
            .post(format!("{}/1.1/media/upload.json", self.upload_base))
            .bearer_auth(self.bearer_token.expose_secret())
            .form(&[("media_data", encoded)])
            .send()
            .await
            .map_err(|e| NotifyError::Twitter(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Twitter(format!("media upload status {status}")));
        }

        let parsed: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Twitter(e.to_string()))?;
        Ok(parsed.media_id_string)
    }
}
