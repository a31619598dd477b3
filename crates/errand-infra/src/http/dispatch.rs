//! Reqwest-backed implementation of the `HttpDispatcher` port.
//!
//! Handles both generic api_call execution (arbitrary REST per the task's
//! request_data) and MCP action posts, where success is strictly HTTP 200.

use errand_core::external::http::{HttpDispatcher, HttpRequestSpec};
use errand_types::error::ServiceError;
use serde_json::Value;
use std::time::Duration;

/// Outbound HTTP dispatcher shared by the external service handler.
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");
        Self { client }
    }
}

impl Default for ReqwestDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a response body as JSON when possible, falling back to a string
/// value for non-JSON payloads.
fn body_to_value(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

impl HttpDispatcher for ReqwestDispatcher {
    async fn dispatch(&self, url: &str, spec: &HttpRequestSpec) -> Result<Value, ServiceError> {
        let method = reqwest::Method::from_bytes(spec.method.as_bytes())
            .map_err(|_| ServiceError::BadRequestData(format!("invalid method: {}", spec.method)))?;

        let mut request = self.client.request(method, url);
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ServiceError::Http(format!("status {status}: {text}")));
        }
        Ok(body_to_value(text))
    }

    async fn post_mcp(&self, endpoint: &str, payload: &Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ServiceError::McpStatus(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        Ok(body_to_value(text))
    }
}
