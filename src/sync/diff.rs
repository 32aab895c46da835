use std::collections::HashMap;

use crate::models::mod_info::{ModFile, ModSummary};
use crate::models::sync_state::SyncState;

/// One file to fetch, tagged with the mod it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub mod_id: String,
    pub mod_name: String,
    pub updated_at: i64,
    pub file: ModFile,
}

/// True when the mod has never been synced or the remote copy is newer than the recorded one.
pub fn is_stale(summary: &ModSummary, state: &SyncState) -> bool {
    match state.get(&summary.id) {
        Some(record) => summary.updated_at > record.updated_at,
        None => true,
    }
}

pub fn stale_mods<'a>(catalog: &'a [ModSummary], state: &SyncState) -> Vec<&'a ModSummary> {
    catalog.iter().filter(|m| is_stale(m, state)).collect()
}

/// Every file of every stale mod, in catalog order.
///
/// Staleness is judged per mod: one newer timestamp re-downloads all of that mod's files.
/// Mods with no file list entry contribute nothing and keep their old record.
pub fn compute_download_set(
    catalog: &[ModSummary],
    file_lists: &HashMap<String, Vec<ModFile>>,
    state: &SyncState,
) -> Vec<DownloadTask> {
    stale_mods(catalog, state)
        .into_iter()
        .flat_map(|summary| {
            file_lists
                .get(&summary.id)
                .into_iter()
                .flatten()
                .map(move |file| DownloadTask {
                    mod_id: summary.id.clone(),
                    mod_name: summary.name.clone(),
                    updated_at: summary.updated_at,
                    file: file.clone(),
                })
        })
        .collect()
}
