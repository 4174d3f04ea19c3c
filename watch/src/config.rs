use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

pub const BEACON_NODE_URL: &str = "http://localhost:5052";
pub const DATABASE_PATH: &str = "validator_state.sqlite";
pub const LOG_LEVEL: &str = "info";
/// Roughly ten epochs of blocks.
pub const EXPERIMENT_DURATION_BLOCKS: u64 = 330;
pub const FETCH_BLOCK_INTERVAL_SECONDS: u64 = 12;
pub const SAME_BLOCK_RETRIES: u64 = 3;
pub const REQUEST_TIMEOUT_SECONDS: u64 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub beacon_node_url: String,
    pub database_path: PathBuf,
    pub log_level: String,
    /// Number of blocks to process before wrapping up.
    pub experiment_duration_blocks: u64,
    pub fetch_block_interval_seconds: u64,
    /// Attempts at fetching the same slot before skipping it.
    pub same_block_retries: u64,
    pub request_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            beacon_node_url: BEACON_NODE_URL.to_string(),
            database_path: PathBuf::from(DATABASE_PATH),
            log_level: LOG_LEVEL.to_string(),
            experiment_duration_blocks: EXPERIMENT_DURATION_BLOCKS,
            fetch_block_interval_seconds: FETCH_BLOCK_INTERVAL_SECONDS,
            same_block_retries: SAME_BLOCK_RETRIES,
            request_timeout_seconds: REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Config {
    pub fn load_from_file(path_to_file: String) -> Result<Config, String> {
        let file =
            File::open(&path_to_file).map_err(|e| format!("Error reading config file: {:?}", e))?;
        let config: Config = serde_yaml::from_reader(file)
            .map_err(|e| format!("Error parsing config file: {:?}", e))?;
        Ok(config)
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_block_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
