use anyhow::{Context, Result};
use console::style;

use crate::api::gamebanana::GamebananaClient;
use crate::commands;
use crate::utils;

pub async fn run<E: utils::Env>(env: &E, mod_id: &str) -> Result<()> {
    let config = utils::load_config(env)?;
    let client = GamebananaClient::new(commands::transport_for(&config)?, &config.api_base_url());

    println!("🔍 Fetching mod {}...", mod_id);

    // Description failures come back as text, so only the file list can fail here.
    let (description, files) = tokio::join!(
        client.fetch_full_description(mod_id),
        client.fetch_file_list(mod_id)
    );
    let files = files.with_context(|| format!("Failed to fetch files for mod {}", mod_id))?;

    println!("\n{}", style("Description").bold());
    println!("{}", description);

    println!("\n{}", style("Files").bold());
    if files.is_empty() {
        println!("  (no downloadable files)");
    }
    for file in &files {
        println!("  {}  {}", file.file_name, style(&file.download_url).dim());
    }

    Ok(())
}
