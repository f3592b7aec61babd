use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MonitorConfig {
    /// Base URL of the Duplicati server, e.g. `http://127.0.0.1:8200`.
    #[serde(default)]
    #[validate(url)]
    pub base_url: String,

    /// Numeric ID of the backup job to monitor.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub backup_id: String,

    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Seconds between poll ticks.
    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 1))]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json { path: String },
}

fn default_verify_ssl() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    300
}
