pub mod diff;
pub mod lock;
pub mod orchestrator;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::gamebanana::GamebananaClient;
use crate::api::transport::HttpTransport;
use crate::models::config::{FailurePolicy, SyncConfig};
use crate::models::mod_info::{ModFile, ModSummary};
use crate::models::sync_state::{StateGuard, SyncState};
use crate::utils::errors::BananasyncError;

use diff::DownloadTask;
use lock::SessionLock;
use orchestrator::{BatchOutcome, Orchestrator, ProgressCallback};

/// What a session would do, computed without touching the disk.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub catalog: Vec<ModSummary>,
    pub stale_mods: usize,
    pub tasks: Vec<DownloadTask>,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub catalog_size: usize,
    pub stale_mods: usize,
    pub outcome: BatchOutcome,
}

pub struct SyncSession {
    client: GamebananaClient,
    transport: Arc<dyn HttpTransport>,
    game_id: String,
    download_dir: PathBuf,
    state_file: PathBuf,
    max_concurrent_requests: usize,
    max_concurrent_downloads: usize,
    failure_policy: FailurePolicy,
    progress: Option<ProgressCallback>,
    interrupt: CancellationToken,
}

impl SyncSession {
    /// Relative paths in `config` are resolved against `root`.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &SyncConfig, root: &Path) -> Self {
        Self {
            client: GamebananaClient::new(transport.clone(), &config.api_base_url()),
            transport,
            game_id: config.game_id.clone(),
            download_dir: config.download_dir_in(root),
            state_file: config.state_file_in(root),
            max_concurrent_requests: config.max_concurrent_requests.max(1),
            max_concurrent_downloads: config.max_concurrent_downloads.max(1),
            failure_policy: config.failure_policy,
            progress: None,
            interrupt: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// See [`Orchestrator::with_interrupt`].
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Fetches the catalog and the file lists of stale mods, then diffs them against `state`.
    pub async fn plan(&self, state: &SyncState) -> Result<SyncPlan> {
        let catalog = self.client.fetch_catalog(&self.game_id).await?;
        let stale = diff::stale_mods(&catalog, state);
        let stale_mods = stale.len();
        info!("{} of {} mods need syncing", stale_mods, catalog.len());

        let file_lists: HashMap<String, Vec<ModFile>> = stream::iter(stale)
            .map(|summary| async move {
                let files = self.client.fetch_file_list(&summary.id).await?;
                Ok::<_, anyhow::Error>((summary.id.clone(), files))
            })
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let tasks = diff::compute_download_set(&catalog, &file_lists, state);
        Ok(SyncPlan {
            catalog,
            stale_mods,
            tasks,
        })
    }

    /// Plans against the saved state without locking, downloading or writing anything.
    pub async fn dry_run(&self) -> Result<SyncPlan> {
        let state = SyncState::peek(&self.state_file);
        self.plan(&state).await
    }

    /// Runs one full session. The sync state is saved exactly once before this returns,
    /// whether the session succeeded, failed part way through or was cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<SyncReport> {
        let _lock = SessionLock::acquire(&self.state_file)?;
        let mut guard = StateGuard::load(&self.state_file);

        let body = self.run_body(guard.state_mut(), &cancel).await;
        let persisted = guard.finish();

        let report = match body {
            Ok(report) => report,
            Err(err) => {
                if let Err(save_err) = persisted {
                    warn!("Failed to save sync state: {:#}", save_err);
                }
                return Err(err);
            }
        };

        if let Err(save_err) = persisted {
            if report.outcome.is_success() {
                return Err(anyhow!(BananasyncError::StatePersist(format!(
                    "{:#}",
                    save_err
                ))));
            }
            warn!("Failed to save sync state: {:#}", save_err);
        }

        report.outcome.ensure_success()?;
        Ok(report)
    }

    async fn run_body(&self, state: &mut SyncState, cancel: &CancellationToken) -> Result<SyncReport> {
        let plan = tokio::select! {
            plan = self.plan(state) => plan?,
            _ = cancel.cancelled() => return Err(anyhow!(BananasyncError::Cancelled)),
        };

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.download_dir.display()))?;

        let mut orchestrator = Orchestrator::new(self.transport.clone())
            .with_max_concurrent(self.max_concurrent_downloads)
            .with_policy(self.failure_policy)
            .with_cancellation(cancel.clone())
            .with_interrupt(self.interrupt.clone());
        if let Some(ref progress) = self.progress {
            orchestrator = orchestrator.with_progress(progress.clone());
        }

        let outcome = orchestrator
            .run_batch(plan.tasks, &self.download_dir, state)
            .await;

        Ok(SyncReport {
            catalog_size: plan.catalog.len(),
            stale_mods: plan.stale_mods,
            outcome,
        })
    }
}
