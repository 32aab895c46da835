use anyhow::{anyhow, Context, Result};
use dialoguer::Input;
use std::path::PathBuf;

use crate::models::config::{SyncConfig, DEFAULT_DOWNLOAD_DIR, DEFAULT_STATE_FILE};
use crate::utils;
use crate::utils::errors::BananasyncError;

pub async fn run<E: utils::Env>(
    env: &E,
    game_id_opt: Option<String>,
    download_dir_opt: Option<PathBuf>,
    state_file_opt: Option<PathBuf>,
) -> Result<()> {
    if utils::config_exists(env) {
        return Err(anyhow!(BananasyncError::ConfigAlreadyExists));
    }

    println!("🍌 Setting up a new GameBanana mod folder...");

    let game_id = if let Some(game_id) = game_id_opt {
        game_id
    } else {
        Input::new()
            .with_prompt("GameBanana game ID")
            .interact_text()
            .context("Failed to get game ID")?
    };

    let download_dir = if let Some(dir) = download_dir_opt {
        dir
    } else {
        let dir: String = Input::new()
            .with_prompt("Download directory")
            .default(DEFAULT_DOWNLOAD_DIR.to_string())
            .interact_text()
            .context("Failed to get download directory")?;
        PathBuf::from(dir)
    };

    let state_file = if let Some(file) = state_file_opt {
        file
    } else {
        let file: String = Input::new()
            .with_prompt("Sync state file")
            .default(DEFAULT_STATE_FILE.to_string())
            .interact_text()
            .context("Failed to get sync state file")?;
        PathBuf::from(file)
    };

    let config = SyncConfig::new(game_id, download_dir, state_file);

    utils::ensure_dir_exists(&config.download_dir_in(&env.current_dir()?))?;
    utils::save_config(env, &config)?;

    println!("✅ Initialized successfully!");
    println!("Run 'bananasync sync' to download every mod for game {}.", config.game_id);

    Ok(())
}
