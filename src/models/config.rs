use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://gamebanana.com/apiv11";
pub const DEFAULT_DOWNLOAD_DIR: &str = "mods";
pub const DEFAULT_STATE_FILE: &str = "mods.json";

/// What the download orchestrator does after one file in a batch fails.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop issuing new downloads; in-flight ones are allowed to settle.
    #[default]
    #[serde(rename = "abort")]
    Abort,
    /// Attempt every task and report all failures at the end.
    #[serde(rename = "continue")]
    Continue,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    pub game_id: String,
    pub download_dir: PathBuf,
    pub state_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default = "default_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_concurrent_downloads() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

impl SyncConfig {
    pub fn new(game_id: String, download_dir: PathBuf, state_file: PathBuf) -> Self {
        Self {
            game_id,
            download_dir,
            state_file,
            api_base_url: None,
            max_concurrent_requests: default_concurrent_requests(),
            max_concurrent_downloads: default_concurrent_downloads(),
            timeout_secs: default_timeout_secs(),
            failure_policy: FailurePolicy::default(),
            user_agent: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `GAMEBANANA_API_URL` takes precedence over the config file.
    pub fn api_base_url(&self) -> String {
        std::env::var("GAMEBANANA_API_URL")
            .ok()
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("bananasync/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn download_dir_in(&self, root: &Path) -> PathBuf {
        root.join(&self.download_dir)
    }

    pub fn state_file_in(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }
}
