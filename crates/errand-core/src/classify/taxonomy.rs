//! The classification taxonomy as versioned configuration data.
//!
//! The rules text and worked examples the model sees are data, not inline
//! string literals scattered through the classifier: they can be serialized,
//! diffed, and replaced without touching code.

use serde::{Deserialize, Serialize};

/// A worked example embedded in the classification prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyExample {
    pub message: String,
    /// The exact JSON the model should produce for this message.
    pub verdict: String,
}

/// Versioned classification taxonomy: rules plus worked examples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub version: String,
    /// The rule text describing each task type.
    pub rules: String,
    pub examples: Vec<TaxonomyExample>,
}

impl Taxonomy {
    /// The current built-in taxonomy.
    pub fn v1() -> Self {
        Self {
            version: "v1".to_string(),
            rules: "\
You classify user messages for an AI agent. Reply with a single JSON object and nothing else.\n\
Task types:\n\
- \"chat\": greetings, small talk, questions about the agent, anything conversational.\n\
- \"api_call\" with service_name \"image_generation\": the user wants a picture drawn, \
generated, or rendered. Put the full user text in request_data.prompt.\n\
- \"api_call\" with another service_name: the user wants data fetched from a URL or API. \
service_name is the request target; request_data holds {\"method\", \"body\", \"headers\"}.\n\
- \"blockchain_tx\": the user wants to send, swap, or trade tokens. service_name is the \
chain (e.g. \"solana\"); request_data holds the transfer parameters.\n\
- \"mcp_action\": the user invokes an MCP tool. request_data holds {\"action\", \"params\"}.\n\
Schema: {\"task_type\": ..., \"service_name\"?: ..., \"request_data\"?: ..., \"api_key\"?: ...}.\n\
When in doubt, prefer \"chat\"."
                .to_string(),
            examples: vec![
                TaxonomyExample {
                    message: "hey, how's it going?".to_string(),
                    verdict: r#"{"task_type":"chat"}"#.to_string(),
                },
                TaxonomyExample {
                    message: "Generate image of a sunset".to_string(),
                    verdict: r#"{"task_type":"api_call","service_name":"image_generation","request_data":{"prompt":"Generate image of a sunset"}}"#.to_string(),
                },
                TaxonomyExample {
                    message: "send 0.5 SOL to 9xQe...fNd2".to_string(),
                    verdict: r#"{"task_type":"blockchain_tx","service_name":"solana","request_data":{"amount":0.5,"to":"9xQe...fNd2"}}"#.to_string(),
                },
                TaxonomyExample {
                    message: "fetch the latest price from https://api.example.com/btc".to_string(),
                    verdict: r#"{"task_type":"api_call","service_name":"https://api.example.com/btc","request_data":{"method":"GET"}}"#.to_string(),
                },
            ],
        }
    }

    /// Render the system prompt: rules followed by worked examples.
    pub fn render_system_prompt(&self) -> String {
        let mut prompt = self.rules.clone();
        if !self.examples.is_empty() {
            prompt.push_str("\nExamples:\n");
            for example in &self.examples {
                prompt.push_str(&format!("User: {}\n{}\n", example.message, example.verdict));
            }
        }
        prompt
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::v1()
    }
}
