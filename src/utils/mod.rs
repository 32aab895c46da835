pub mod errors;
pub mod html;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::config::SyncConfig;
use crate::utils::errors::BananasyncError;

const CONFIG_FILENAME: &str = "bananasync.json";

/// Where commands look for their config and resolve relative paths.
pub trait Env {
    fn current_dir(&self) -> Result<PathBuf>;
}

pub struct RealEnv;

impl Env for RealEnv {
    fn current_dir(&self) -> Result<PathBuf> {
        std::env::current_dir().context("Failed to get current directory")
    }
}

pub fn get_config_path<E: Env>(env: &E) -> Result<PathBuf> {
    Ok(env.current_dir()?.join(CONFIG_FILENAME))
}

pub fn config_exists<E: Env>(env: &E) -> bool {
    get_config_path(env).map(|p| p.exists()).unwrap_or(false)
}

pub fn load_config<E: Env>(env: &E) -> Result<SyncConfig> {
    let config_path = get_config_path(env)?;
    if !config_path.exists() {
        return Err(anyhow!(BananasyncError::NoConfigFound));
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let config: SyncConfig = serde_json::from_str(&config_content)
        .with_context(|| "Failed to parse bananasync configuration")?;
    Ok(config)
}

pub fn save_config<E: Env>(env: &E, config: &SyncConfig) -> Result<()> {
    let config_path = get_config_path(env)?;
    let config_content = serde_json::to_string_pretty(config)
        .with_context(|| "Failed to serialize bananasync configuration")?;
    let mut file = File::create(&config_path)
        .with_context(|| format!("Failed to create config file: {}", config_path.display()))?;
    file.write_all(config_content.as_bytes())
        .with_context(|| "Failed to write to config file")?;
    Ok(())
}

pub fn ensure_dir_exists(dir_path: &Path) -> Result<()> {
    if !dir_path.exists() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    Ok(())
}

/// Formats seconds since the epoch as `YYYY-MM-DD` (UTC).
pub fn format_date(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "-".to_string();
    }
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
