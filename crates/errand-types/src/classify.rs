//! Classification types: the verdict a classifier produces for an inbound
//! message, mirroring the JSON contract expected from the model.

use serde::{Deserialize, Serialize};

/// The task-type taxonomy label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTypeTag {
    Chat,
    ApiCall,
    BlockchainTx,
    McpAction,
}

/// A classifier's verdict for one inbound message.
///
/// `service_name`, `request_data`, and `api_key` are populated only for
/// non-chat verdicts; a `Chat` verdict carries nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "task_type")]
    pub kind: TaskTypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Classification {
    /// A plain conversational verdict.
    pub fn chat() -> Self {
        Self {
            kind: TaskTypeTag::Chat,
            service_name: None,
            request_data: None,
            api_key: None,
        }
    }

    /// An image-generation verdict for the given prompt.
    pub fn image_generation(prompt: &str, api_key: Option<String>) -> Self {
        Self {
            kind: TaskTypeTag::ApiCall,
            service_name: Some("image_generation".to_string()),
            request_data: Some(serde_json::json!({ "prompt": prompt })),
            api_key,
        }
    }

    /// Whether this verdict means "just talk".
    pub fn is_chat(&self) -> bool {
        self.kind == TaskTypeTag::Chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_model_json_contract() {
        let json = r#"{
            "task_type": "api_call",
            "service_name": "image_generation",
            "request_data": {"prompt": "a sunset"},
            "api_key": "sk-abc"
        }"#;
        let c: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(c.kind, TaskTypeTag::ApiCall);
        assert_eq!(c.service_name.as_deref(), Some("image_generation"));
        assert_eq!(c.request_data.unwrap()["prompt"], "a sunset");
    }

    #[test]
    fn chat_verdict_parses_without_extras() {
        let c: Classification = serde_json::from_str(r#"{"task_type": "chat"}"#).unwrap();
        assert!(c.is_chat());
        assert!(c.service_name.is_none());
    }

    #[test]
    fn missing_task_type_is_an_error() {
        assert!(serde_json::from_str::<Classification>(r#"{"service_name": "x"}"#).is_err());
    }
}
