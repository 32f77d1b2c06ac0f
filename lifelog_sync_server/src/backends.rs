//! Wires config into concrete transport and storage implementations.

use lifelog_sync_core::config::SyncConfig;
use lifelog_sync_core::storage::build_filestore;
use lifelog_sync_core::{Result, SyncJob};
use lifelog_sync_integrations::LimitlessClient;
use std::sync::Arc;

#[tracing::instrument(level = "info", skip_all)]
pub async fn build_job(cfg: SyncConfig) -> Result<SyncJob> {
    let transport = Arc::new(LimitlessClient::new(&cfg.api)?);
    let filestore = build_filestore(&cfg.storage).await?;
    Ok(SyncJob::new(transport, filestore, cfg))
}
