use serde::{Deserialize, Serialize};

/// Snapshot of a mod as it appeared in the remote catalog at fetch time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ModSummary {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub description: String,
    pub image_url: String,
    pub page_url: String,
    /// Seconds since the epoch.
    pub updated_at: i64,
    pub added_at: i64,
    pub views: u64,
    pub likes: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ModFile {
    pub file_name: String,
    pub download_url: String,
}

impl ModFile {
    pub fn new(file_name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            download_url: download_url.into(),
        }
    }
}
