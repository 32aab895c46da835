use thiserror::Error;

#[derive(Error, Debug)]
pub enum BananasyncError {
    #[error("No bananasync.json found in the current directory. Run 'bananasync init' first.")]
    NoConfigFound,

    #[error("A bananasync.json already exists in this directory")]
    ConfigAlreadyExists,

    #[error("Failed to reach GameBanana (status: {}): {message}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed response from GameBanana: {0}")]
    MalformedResponse(String),

    #[error("{failed} of {total} downloads failed")]
    DownloadFailed { failed: usize, total: usize },

    #[error("Sync was cancelled before all downloads were started")]
    Cancelled,

    #[error("Another sync session holds the lock at {0}. If no sync is running, delete that file and retry.")]
    SessionLocked(String),

    #[error("Failed to save sync state: {0}")]
    StatePersist(String),

    #[error("Refusing to write file with unsafe name '{0}'")]
    InvalidFileName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
}

impl BananasyncError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }
}
