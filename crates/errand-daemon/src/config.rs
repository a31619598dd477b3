//! Daemon configuration loaded from a TOML file.
//!
//! Everything except the OpenAI key is optional: pipeline tunables fall
//! back to their built-in defaults, the database lands under the default
//! data dir, and an empty agent list just means nothing gets notified on
//! Twitter or Telegram.

use std::path::Path;

use anyhow::Context;
use errand_types::agent::AgentProfile;
use errand_types::config::PipelineConfig;
use serde::Deserialize;

/// Top-level `errandd` configuration.
#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    /// SQLite URL; defaults to `$ERRAND_DATA_DIR/errand.db`.
    #[serde(default)]
    pub database_url: Option<String>,
    /// OpenAI key used for image generation when a task carries no
    /// per-agent key.
    pub openai_api_key: String,
    /// Endpoint that receives MCP action posts. Tasks routed to MCP fail
    /// when this is unset.
    #[serde(default)]
    pub mcp_endpoint: Option<String>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Agent personas this daemon notifies for.
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: DaemonConfig = toml::from_str(r#"openai_api_key = "sk-test""#).unwrap();
        assert!(config.database_url.is_none());
        assert!(config.mcp_endpoint.is_none());
        assert_eq!(config.pipeline.task_max_age_secs, 60);
        assert!(config.agents.is_empty());
    }

    #[test]
    fn full_config_parses_agents() {
        let raw = r#"
database_url = "sqlite:///tmp/errand.db"
openai_api_key = "sk-test"
mcp_endpoint = "http://localhost:8900/actions"

[pipeline]
task_max_age_secs = 120
daily_task_limit = 10

[[agents]]
id = "0192c3a0-0000-7000-8000-000000000000"
name = "luna"

[agents.twitter]
bearer_token = "tw-token"
"#;
        let config: DaemonConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.pipeline.task_max_age_secs, 120);
        assert_eq!(config.pipeline.daily_task_limit, 10);
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].name, "luna");
        assert!(config.agents[0].twitter.is_some());
        assert!(config.agents[0].telegram.is_none());
    }
}
