//! External service dispatch.
//!
//! One handler owns every non-chat execution path. Each branch returns the
//! raw response payload; interpreting it (result string, URL validation,
//! retry accounting) is the processor's job.

use errand_types::error::ServiceError;
use errand_types::task::{Task, TaskKind};
use serde_json::{Value, json};
use uuid::Uuid;

use super::http::{HttpDispatcher, HttpRequestSpec};
use super::image::ImageGenerator;

/// Port the task processor drives. Implementations must not panic; every
/// failure mode is a `ServiceError`.
pub trait ExternalServiceHandler: Send + Sync {
    /// Execute the task's external call and return the response payload.
    fn process(
        &self,
        task: &Task,
    ) -> impl std::future::Future<Output = Result<Value, ServiceError>> + Send;
}

/// Production handler: dispatches on `TaskKind` to the image generator,
/// generic HTTP, the blockchain stub, or the MCP endpoint.
pub struct DefaultServiceHandler<I, H> {
    images: I,
    http: H,
    mcp_endpoint: Option<String>,
    /// Process-wide OpenAI key used when the task carries none.
    default_api_key: Option<String>,
}

impl<I: ImageGenerator, H: HttpDispatcher> DefaultServiceHandler<I, H> {
    pub fn new(images: I, http: H) -> Self {
        Self {
            images,
            http,
            mcp_endpoint: None,
            default_api_key: None,
        }
    }

    pub fn with_mcp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.mcp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_default_api_key(mut self, key: impl Into<String>) -> Self {
        self.default_api_key = Some(key.into());
        self
    }

    async fn process_api_call(
        &self,
        task: &Task,
        service_name: &str,
        request_data: &Value,
        task_api_key: Option<&str>,
    ) -> Result<Value, ServiceError> {
        if service_name == "image_generation" {
            let prompt = request_data
                .get("prompt")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or(ServiceError::MissingPrompt)?;
            let api_key = task_api_key
                .or(self.default_api_key.as_deref())
                .ok_or(ServiceError::MissingApiKey)?;

            tracing::info!(task_id = task.task_id.as_str(), "generating image");
            let url = self.images.generate(prompt, api_key).await?;
            return Ok(json!({ "url": url }));
        }

        let spec = HttpRequestSpec::from_request_data(request_data)?;
        tracing::info!(
            task_id = task.task_id.as_str(),
            url = service_name,
            method = spec.method.as_str(),
            "dispatching api call"
        );
        self.http.dispatch(service_name, &spec).await
    }

    async fn process_blockchain(
        &self,
        task: &Task,
        service_name: &str,
    ) -> Result<Value, ServiceError> {
        if !service_name.eq_ignore_ascii_case("solana") {
            return Err(ServiceError::UnsupportedService(service_name.to_string()));
        }
        // Stub chain backend: acknowledge with a mock signature.
        let signature = format!("mock_tx_{}", Uuid::now_v7().simple());
        tracing::info!(
            task_id = task.task_id.as_str(),
            signature = signature.as_str(),
            "simulated solana transaction"
        );
        Ok(json!({
            "chain": "solana",
            "signature": signature,
            "status": "submitted"
        }))
    }

    async fn process_mcp(&self, task: &Task, request_data: &Value) -> Result<Value, ServiceError> {
        let endpoint = self
            .mcp_endpoint
            .as_deref()
            .ok_or_else(|| ServiceError::Http("MCP endpoint not configured".to_string()))?;
        tracing::info!(
            task_id = task.task_id.as_str(),
            endpoint,
            "posting mcp action"
        );
        self.http.post_mcp(endpoint, request_data).await
    }
}

impl<I: ImageGenerator, H: HttpDispatcher> ExternalServiceHandler for DefaultServiceHandler<I, H> {
    async fn process(&self, task: &Task) -> Result<Value, ServiceError> {
        match &task.kind {
            // Chat never reaches the handler in normal flow.
            TaskKind::Chat => Err(ServiceError::UnsupportedTaskType),
            TaskKind::ApiCall(svc) => {
                self.process_api_call(task, &svc.service_name, &svc.request_data, svc.api_key.as_deref())
                    .await
            }
            TaskKind::BlockchainTx(svc) => self.process_blockchain(task, &svc.service_name).await,
            TaskKind::McpAction(svc) => self.process_mcp(task, &svc.request_data).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errand_types::task::{Channel, ExternalService, RequesterId};
    use std::sync::Mutex;

    struct FakeImages {
        url: String,
        last_key: Mutex<Option<String>>,
    }

    impl ImageGenerator for FakeImages {
        async fn generate(&self, _prompt: &str, api_key: &str) -> Result<String, ServiceError> {
            *self.last_key.lock().unwrap() = Some(api_key.to_string());
            Ok(self.url.clone())
        }
    }

    struct FakeHttp {
        reply: Value,
        last_url: Mutex<Option<String>>,
    }

    impl HttpDispatcher for FakeHttp {
        async fn dispatch(&self, url: &str, _spec: &HttpRequestSpec) -> Result<Value, ServiceError> {
            *self.last_url.lock().unwrap() = Some(url.to_string());
            Ok(self.reply.clone())
        }

        async fn post_mcp(&self, endpoint: &str, _payload: &Value) -> Result<Value, ServiceError> {
            *self.last_url.lock().unwrap() = Some(endpoint.to_string());
            Ok(self.reply.clone())
        }
    }

    fn handler(url: &str, reply: Value) -> DefaultServiceHandler<FakeImages, FakeHttp> {
        DefaultServiceHandler::new(
            FakeImages {
                url: url.to_string(),
                last_key: Mutex::new(None),
            },
            FakeHttp {
                reply,
                last_url: Mutex::new(None),
            },
        )
    }

    fn task(kind: TaskKind) -> Task {
        Task::new(
            "t-1",
            Channel::Web,
            "u-1",
            RequesterId::Temporary("anon".to_string()),
            Uuid::now_v7(),
            "command",
            kind,
        )
    }

    #[tokio::test]
    async fn image_generation_returns_url_payload() {
        let mut svc = ExternalService::new("image_generation", json!({"prompt": "a cat"}));
        svc.api_key = Some("sk-task".to_string());
        let h = handler("https://cdn.example.com/cat.png", Value::Null);

        let out = h.process(&task(TaskKind::ApiCall(svc))).await.unwrap();
        assert_eq!(out["url"], "https://cdn.example.com/cat.png");
        assert_eq!(h.images.last_key.lock().unwrap().as_deref(), Some("sk-task"));
    }

    #[tokio::test]
    async fn image_generation_requires_prompt_and_key() {
        let h = handler("https://x/y.png", Value::Null);

        let no_prompt = ExternalService::new("image_generation", json!({"prompt": "  "}));
        let err = h.process(&task(TaskKind::ApiCall(no_prompt))).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingPrompt));

        let no_key = ExternalService::new("image_generation", json!({"prompt": "a cat"}));
        let err = h.process(&task(TaskKind::ApiCall(no_key))).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingApiKey));
    }

    #[tokio::test]
    async fn default_key_backs_image_generation() {
        let svc = ExternalService::new("image_generation", json!({"prompt": "a cat"}));
        let h = handler("https://x/y.png", Value::Null).with_default_api_key("sk-default");

        h.process(&task(TaskKind::ApiCall(svc))).await.unwrap();
        assert_eq!(
            h.images.last_key.lock().unwrap().as_deref(),
            Some("sk-default")
        );
    }

    #[tokio::test]
    async fn generic_api_call_targets_service_name() {
        let svc = ExternalService::new("https://api.example.com/btc", json!({"method": "GET"}));
        let h = handler("unused", json!({"price": 64000}));

        let out = h.process(&task(TaskKind::ApiCall(svc))).await.unwrap();
        assert_eq!(out["price"], 64000);
        assert_eq!(
            h.http.last_url.lock().unwrap().as_deref(),
            Some("https://api.example.com/btc")
        );
    }

    #[tokio::test]
    async fn solana_stub_returns_mock_signature() {
        let svc = ExternalService::new("solana", json!({"command": "send 1 SOL"}));
        let h = handler("unused", Value::Null);

        let out = h.process(&task(TaskKind::BlockchainTx(svc))).await.unwrap();
        assert!(out["signature"].as_str().unwrap().starts_with("mock_tx_"));
        assert_eq!(out["chain"], "solana");
    }

    #[tokio::test]
    async fn non_solana_chain_is_unsupported() {
        let svc = ExternalService::new("ethereum", json!({}));
        let h = handler("unused", Value::Null);

        let err = h.process(&task(TaskKind::BlockchainTx(svc))).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedService(name) if name == "ethereum"));
    }

    #[tokio::test]
    async fn mcp_posts_to_configured_endpoint() {
        let svc = ExternalService::new("mcp", json!({"action": "execute", "params": {}}));
        let h = handler("unused", json!({"ok": true})).with_mcp_endpoint("http://localhost:9090/mcp");

        let out = h.process(&task(TaskKind::McpAction(svc))).await.unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(
            h.http.last_url.lock().unwrap().as_deref(),
            Some("http://localhost:9090/mcp")
        );
    }

    #[tokio::test]
    async fn mcp_without_endpoint_fails() {
        let svc = ExternalService::new("mcp", json!({"action": "execute", "params": {}}));
        let h = handler("unused", Value::Null);
        assert!(h.process(&task(TaskKind::McpAction(svc))).await.is_err());
    }

    #[tokio::test]
    async fn chat_is_unsupported() {
        let h = handler("unused", Value::Null);
        let err = h.process(&task(TaskKind::Chat)).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedTaskType));
        assert_eq!(err.to_string(), "Unsupported task type");
    }
}
