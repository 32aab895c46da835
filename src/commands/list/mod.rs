use anyhow::{Context, Result};
use console::style;

use crate::api::gamebanana::GamebananaClient;
use crate::commands;
use crate::models::sync_state::SyncState;
use crate::sync::diff;
use crate::utils;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

pub async fn run<E: utils::Env>(env: &E, limit: Option<usize>) -> Result<()> {
    let config = utils::load_config(env)?;
    let root = env.current_dir()?;
    let client = GamebananaClient::new(commands::transport_for(&config)?, &config.api_base_url());

    println!("🔍 Fetching mods for game {}...", config.game_id);

    let mods = client
        .fetch_catalog(&config.game_id)
        .await
        .context("Failed to fetch mod catalog")?;
    let state = SyncState::peek(&config.state_file_in(&root));

    println!("\n{} mods found:", mods.len());
    println!(
        "  {:<10} {:<36} {:<18} {:>8} {:>6} {:<10}",
        style("ID").bold(),
        style("Name").bold(),
        style("Creator").bold(),
        style("Views").bold(),
        style("Likes").bold(),
        style("Updated").bold()
    );

    for summary in mods.iter().take(limit.unwrap_or(usize::MAX)) {
        let marker = if diff::is_stale(summary, &state) {
            style("*").yellow().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:<10} {:<36} {:<18} {:>8} {:>6} {:<10}",
            marker,
            summary.id,
            truncate(&summary.name, 36),
            truncate(&summary.creator, 18),
            summary.views,
            summary.likes,
            utils::format_date(summary.updated_at)
        );
    }

    println!(
        "\n{} marks mods that are new or updated since the last sync.",
        style("*").yellow()
    );

    Ok(())
}
