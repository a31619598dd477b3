//! Pipeline configuration with serde defaults.
//!
//! Every interval and limit the polling loops consume lives here so the
//! daemon's `config.toml` can override them. The 60-second task age ceiling
//! from the original design is deliberately a parameter, not a constant.

use serde::{Deserialize, Serialize};

/// Tunables for the task pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seconds between task-processor polls.
    #[serde(default = "default_poll_interval_secs")]
    pub processor_interval_secs: u64,
    /// Seconds between task-monitor polls.
    #[serde(default = "default_poll_interval_secs")]
    pub monitor_interval_secs: u64,
    /// Hard wall-clock SLA: tasks older than this are force-failed
    /// ("Task timed out") regardless of progress.
    #[serde(default = "default_task_max_age_secs")]
    pub task_max_age_secs: u64,
    /// Execution attempt ceiling applied to new tasks.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// How many tasks each poll pass pulls from the store.
    #[serde(default = "default_poll_batch")]
    pub poll_batch: u32,
    /// Per-requester task creation ceiling over a rolling 24 hours.
    #[serde(default = "default_daily_task_limit")]
    pub daily_task_limit: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_task_max_age_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_poll_batch() -> u32 {
    50
}

fn default_daily_task_limit() -> u64 {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processor_interval_secs: default_poll_interval_secs(),
            monitor_interval_secs: default_poll_interval_secs(),
            task_max_age_secs: default_task_max_age_secs(),
            max_retries: default_max_retries(),
            poll_batch: default_poll_batch(),
            daily_task_limit: default_daily_task_limit(),
        }
    }
}
