use anyhow::{anyhow, Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::transport::HttpTransport;
use crate::models::config::FailurePolicy;
use crate::models::sync_state::SyncState;
use crate::sync::diff::DownloadTask;
use crate::utils::errors::BananasyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started {
        file_name: String,
        mod_name: String,
        index: usize,
        total: usize,
    },
    Completed {
        file_name: String,
        size: u64,
    },
    Failed {
        file_name: String,
        error: String,
    },
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub mod_id: String,
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub downloaded: usize,
    pub bytes: u64,
    /// Tasks that did not finish: never started after an abort or cancellation, or abandoned
    /// by an interrupt.
    pub skipped: usize,
    pub cancelled: bool,
    pub failures: Vec<DownloadFailure>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Converts a failed or cancelled batch into the matching error.
    pub fn ensure_success(&self) -> Result<()> {
        if !self.failures.is_empty() {
            return Err(anyhow!(BananasyncError::DownloadFailed {
                failed: self.failures.len(),
                total: self.total,
            }));
        }
        if self.cancelled {
            return Err(anyhow!(BananasyncError::Cancelled));
        }
        Ok(())
    }
}

pub struct Orchestrator {
    transport: Arc<dyn HttpTransport>,
    max_concurrent: usize,
    policy: FailurePolicy,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
    interrupt: CancellationToken,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            max_concurrent: 1,
            policy: FailurePolicy::default(),
            progress: None,
            cancel: CancellationToken::new(),
            interrupt: CancellationToken::new(),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Once `interrupt` fires, downloads still running are dropped instead of awaited.
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.progress {
            callback(event);
        }
    }

    /// Downloads `tasks` into `destination`, recording each finished file's mod in `state`.
    ///
    /// At most `max_concurrent` downloads are in flight. Completions are applied to `state`
    /// one at a time from this loop. After a failure under [`FailurePolicy::Abort`], or once
    /// the cancellation token fires, no new download starts but the ones already running are
    /// awaited, so this only returns once every started download has settled. The interrupt
    /// token cuts that wait short; abandoned downloads are not recorded.
    pub async fn run_batch(
        &self,
        tasks: Vec<DownloadTask>,
        destination: &Path,
        state: &mut SyncState,
    ) -> BatchOutcome {
        let total = tasks.len();
        let mut outcome = BatchOutcome {
            total,
            ..Default::default()
        };
        let mut pending = tasks.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut stop_issuing = false;

        loop {
            while !stop_issuing && in_flight.len() < self.max_concurrent {
                if self.cancel.is_cancelled() || self.interrupt.is_cancelled() {
                    info!("Sync cancelled, not starting further downloads");
                    outcome.cancelled = true;
                    stop_issuing = true;
                    break;
                }
                match pending.next() {
                    Some((index, task)) => {
                        in_flight.push(self.download_one(index, total, task, destination))
                    }
                    None => break,
                }
            }

            let next = tokio::select! {
                next = in_flight.next() => next,
                _ = self.interrupt.cancelled(), if !in_flight.is_empty() => {
                    warn!("Abandoning {} downloads in progress", in_flight.len());
                    outcome.cancelled = true;
                    break;
                }
            };
            let Some((task, result)) = next else {
                break;
            };

            match result {
                Ok(size) => {
                    state.record(&task.mod_id, task.updated_at);
                    outcome.downloaded += 1;
                    outcome.bytes += size;
                    self.report(ProgressEvent::Completed {
                        file_name: task.file.file_name,
                        size,
                    });
                }
                Err(err) => {
                    let error = format!("{:#}", err);
                    warn!("Failed to download {}: {}", task.file.file_name, error);
                    self.report(ProgressEvent::Failed {
                        file_name: task.file.file_name.clone(),
                        error: error.clone(),
                    });
                    outcome.failures.push(DownloadFailure {
                        mod_id: task.mod_id,
                        file_name: task.file.file_name,
                        error,
                    });
                    if self.policy == FailurePolicy::Abort && !stop_issuing {
                        info!("Aborting remaining downloads after first failure");
                        stop_issuing = true;
                    }
                }
            }
        }

        outcome.skipped = total - outcome.downloaded - outcome.failures.len();
        debug!(
            "Batch finished: {} downloaded, {} failed, {} skipped",
            outcome.downloaded,
            outcome.failures.len(),
            outcome.skipped
        );
        outcome
    }

    async fn download_one(
        &self,
        index: usize,
        total: usize,
        task: DownloadTask,
        destination: &Path,
    ) -> (DownloadTask, Result<u64>) {
        self.report(ProgressEvent::Started {
            file_name: task.file.file_name.clone(),
            mod_name: task.mod_name.clone(),
            index,
            total,
        });
        info!("Downloading {} ({})", task.file.file_name, task.mod_name);

        let result = self.fetch_to_disk(&task, destination).await;
        (task, result)
    }

    async fn fetch_to_disk(&self, task: &DownloadTask, destination: &Path) -> Result<u64> {
        let target = target_path(destination, &task.file.file_name)?;
        let response = self
            .transport
            .download(&task.file.download_url)
            .await
            .with_context(|| format!("Failed to download {}", task.file.file_name))?;

        let size = response.body.len() as u64;
        let file_name = task.file.file_name.clone();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            write_atomically(&destination, &file_name, &target, &response.body)
        })
        .await
        .context("Download writer task panicked")??;

        Ok(size)
    }
}

/// Writes `body` to a uniquely named temp file in `destination`, then renames it onto `target`.
/// Tasks sharing a file name never share a temp file, and a failed write leaves `target` untouched.
fn write_atomically(destination: &Path, file_name: &str, target: &Path, body: &[u8]) -> Result<()> {
    let mut partial = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".part")
        .tempfile_in(destination)
        .with_context(|| format!("Failed to create temp file in {}", destination.display()))?;
    partial
        .write_all(body)
        .with_context(|| format!("Failed to write {}", partial.path().display()))?;
    partial
        .persist(target)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to move file into {}", target.display()))?;
    Ok(())
}

/// Remote file names are used verbatim, so anything that could escape the directory is refused.
fn target_path(destination: &Path, file_name: &str) -> Result<PathBuf> {
    let unsafe_name = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\'])
        || file_name.contains('\0');
    if unsafe_name {
        return Err(anyhow!(BananasyncError::InvalidFileName(file_name.to_string())));
    }
    Ok(destination.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_file_names_are_rejected() {
        let dest = Path::new("/tmp/mods");
        assert!(target_path(dest, "garden.zip").is_ok());
        for name in ["", "..", "../evil.zip", "sub/dir.zip", "c:\\evil.zip"] {
            assert!(target_path(dest, name).is_err(), "{} should be rejected", name);
        }
    }

    #[test]
    fn outcome_reports_failures_before_cancellation() {
        let outcome = BatchOutcome {
            total: 3,
            downloaded: 1,
            skipped: 1,
            cancelled: true,
            failures: vec![DownloadFailure {
                mod_id: "1".to_string(),
                file_name: "a.zip".to_string(),
                error: "boom".to_string(),
            }],
            ..Default::default()
        };

        let err = outcome.ensure_success().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BananasyncError>(),
            Some(BananasyncError::DownloadFailed { failed: 1, total: 3 })
        ));
    }
}
