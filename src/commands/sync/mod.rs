use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::transport::HttpTransport;
use crate::commands;
use crate::models::config::{FailurePolicy, SyncConfig};
use crate::sync::orchestrator::ProgressEvent;
use crate::sync::{SyncReport, SyncSession};
use crate::utils;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub continue_on_error: bool,
    pub jobs: Option<usize>,
}

pub async fn run<E: utils::Env>(env: &E, options: SyncOptions) -> Result<()> {
    let config = utils::load_config(env)?;
    let transport = commands::transport_for(&config)?;

    let cancel = CancellationToken::new();
    let interrupt = CancellationToken::new();
    let (cancel_token, interrupt_token) = (cancel.clone(), interrupt.clone());
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!(
            "{}",
            style("Interrupted, finishing downloads in progress and saving state. Press Ctrl-C again to stop now.")
                .yellow()
        );
        cancel_token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                style("Stopping downloads in progress and saving state...").yellow()
            );
            interrupt_token.cancel();
        }
    });

    let result = execute(env, config, transport, options, cancel, interrupt).await;
    ctrl_c.abort();
    result
}

/// Runs a sync with an explicit transport. `cancel` stops new downloads; `interrupt` also
/// abandons the ones in progress.
pub async fn execute<E: utils::Env>(
    env: &E,
    mut config: SyncConfig,
    transport: Arc<dyn HttpTransport>,
    options: SyncOptions,
    cancel: CancellationToken,
    interrupt: CancellationToken,
) -> Result<()> {
    if options.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }
    if let Some(jobs) = options.jobs {
        config.max_concurrent_downloads = jobs;
    }

    let root = env.current_dir()?;
    let session = SyncSession::new(transport, &config, &root).with_interrupt(interrupt);

    if options.dry_run {
        let plan = session.dry_run().await.context("Failed to plan sync")?;
        println!(
            "{} mods in catalog, {} new or updated, {} files to download:",
            plan.catalog.len(),
            plan.stale_mods,
            plan.tasks.len()
        );
        for task in &plan.tasks {
            println!("  {} ({})", task.file.file_name, style(&task.mod_name).dim());
        }
        return Ok(());
    }

    println!("🍌 Syncing mods for game {}...", config.game_id);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Failed to create progress bar style")?
            .progress_chars("#>-"),
    );
    let bar = pb.clone();
    let session = session.with_progress(Arc::new(move |event: ProgressEvent| match event {
        ProgressEvent::Started {
            file_name, total, ..
        } => {
            bar.set_length(total as u64);
            bar.set_message(format!("Downloading {}...", file_name));
        }
        ProgressEvent::Completed { .. } => bar.inc(1),
        ProgressEvent::Failed { file_name, error } => {
            bar.inc(1);
            bar.println(format!("{} {}: {}", style("✗").red(), file_name, error));
        }
    }));

    let result = session.run(cancel).await;
    pb.finish_and_clear();

    let report = result?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.outcome.total == 0 {
        println!("✅ All {} mods are up to date.", report.catalog_size);
        return;
    }
    println!(
        "✅ Downloaded {} files ({} bytes) for {} updated mods.",
        report.outcome.downloaded, report.outcome.bytes, report.stale_mods
    );
}
