//! OpenAI images API client.
//!
//! Plain reqwest against `/v1/images/generations`: fixed model, fixed
//! square size, single image, URL response format. The API key is supplied
//! per call because image tasks can carry their own credential.

use errand_core::external::image::ImageGenerator;
use errand_types::error::ServiceError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const MODEL: &str = "dall-e-3";
const SIZE: &str = "1024x1024";

/// Image generator backed by the OpenAI images API.
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiImageGenerator {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // image generation is slow
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url.trim_end_matches('/'))
    }
}

impl Default for OpenAiImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, ServiceError> {
        let body = json!({
            "model": MODEL,
            "prompt": prompt,
            "n": 1,
            "size": SIZE,
            "response_format": "url",
        });
        tracing::debug!(model = MODEL, prompt_chars = prompt.len(), "requesting image generation");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::ImageGeneration(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::ImageGeneration(format!(
                "status {status}: {detail}"
            )));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ImageGeneration(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| ServiceError::ImageGeneration("no image URL in response".to_string()))
    }
}
