//! Deterministic keyword classifier.
//!
//! The always-available fallback when the model is unreachable or returns
//! garbage. Rules are checked in order of specificity: image generation,
//! blockchain, MCP, generic API, then chat.

use std::sync::OnceLock;

use errand_types::agent::AgentProfile;
use errand_types::classify::{Classification, TaskTypeTag};
use regex::Regex;
use serde_json::json;

struct KeywordRules {
    image_verb: Regex,
    image_make: Regex,
    visual_noun: Regex,
    chain_verb: Regex,
    chain_token: Regex,
    mcp: Regex,
    api: Regex,
    url: Regex,
}

static RULES: OnceLock<KeywordRules> = OnceLock::new();

fn rules() -> &'static KeywordRules {
    RULES.get_or_init(|| KeywordRules {
        image_verb: Regex::new(r"(?i)\b(draw|paint|sketch|illustrate|visualize)\b").unwrap(),
        image_make: Regex::new(r"(?i)\b(generate|create|make|produce|render)\b").unwrap(),
        visual_noun: Regex::new(
            r"(?i)\b(image|picture|photo|pic|art|artwork|drawing|painting|illustration|logo|avatar|icon|meme|wallpaper|poster|portrait)\b",
        )
        .unwrap(),
        chain_verb: Regex::new(r"(?i)\b(send|transfer|swap|stake|buy|sell|mint|bridge)\b").unwrap(),
        chain_token: Regex::new(
            r"(?i)\b(sol|solana|token|tokens|nft|coin|coins|crypto|wallet|address|lamports)\b",
        )
        .unwrap(),
        mcp: Regex::new(r"(?i)\bmcp\b").unwrap(),
        api: Regex::new(r"(?i)\b(fetch|api|endpoint|request|scrape|query|lookup|http|get|post)\b")
            .unwrap(),
        url: Regex::new(r"https?://\S+").unwrap(),
    })
}

/// Stateless keyword classifier. Never fails and never calls out.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a message by keyword tables alone.
    pub fn classify(&self, message: &str, agent: &AgentProfile) -> Classification {
        let r = rules();

        // Image generation: a drawing verb alone, or a making verb paired
        // with a visual noun ("generate an image of ...").
        if r.image_verb.is_match(message)
            || (r.image_make.is_match(message) && r.visual_noun.is_match(message))
        {
            return Classification::image_generation(message, agent.openai_api_key.clone());
        }

        // Blockchain: transfer verb plus an asset/address token.
        if r.chain_verb.is_match(message) && r.chain_token.is_match(message) {
            return Classification {
                kind: TaskTypeTag::BlockchainTx,
                service_name: Some("solana".to_string()),
                request_data: Some(json!({ "command": message })),
                api_key: None,
            };
        }

        if r.mcp.is_match(message) {
            return Classification {
                kind: TaskTypeTag::McpAction,
                service_name: Some("mcp".to_string()),
                request_data: Some(json!({ "action": "execute", "params": { "command": message } })),
                api_key: None,
            };
        }

        // Generic API: fetch/api keywords, ideally with a URL target.
        if r.api.is_match(message) && (r.url.is_match(message) || message.to_lowercase().contains("api")) {
            let target = r
                .url
                .find(message)
                .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
                .unwrap_or_else(|| "api_request".to_string());
            return Classification {
                kind: TaskTypeTag::ApiCall,
                service_name: Some(target),
                request_data: Some(json!({ "method": "GET" })),
                api_key: None,
            };
        }

        Classification::chat()
    }
}
