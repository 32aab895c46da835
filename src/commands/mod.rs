pub mod info;
pub mod init;
pub mod list;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::api::transport::{HttpTransport, ReqwestTransport};
use crate::models::config::SyncConfig;

pub fn transport_for(config: &SyncConfig) -> Result<Arc<dyn HttpTransport>> {
    let transport = ReqwestTransport::new(&config.user_agent(), config.timeout())
        .context("Failed to initialize GameBanana HTTP client")?;
    Ok(Arc::new(transport))
}
