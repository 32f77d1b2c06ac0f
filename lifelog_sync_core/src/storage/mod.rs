//! Filestore backends for persisted chunks.

pub mod local;
pub mod s3;

pub use local::LocalFilestore;
pub use s3::S3Filestore;

use crate::config::StorageConfig;
use crate::sync::traits::Filestore;
use crate::{Error, Result};
use std::sync::Arc;

/// Builds the filestore selected by the config.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn build_filestore(cfg: &StorageConfig) -> Result<Arc<dyn Filestore>> {
    match cfg {
        StorageConfig::S3(s3) => Ok(Arc::new(S3Filestore::new(s3).await?)),
        StorageConfig::Local { root_dir } => {
            Ok(Arc::new(LocalFilestore::new(root_dir.clone()).await?))
        }
    }
}

/// Rejects keys that could escape the configured root or prefix.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("filestore key is empty".to_string()));
    }
    if key.starts_with('/') {
        return Err(Error::InvalidInput(
            "filestore key must not start with '/'".to_string(),
        ));
    }
    if key.contains('\\') {
        return Err(Error::InvalidInput(
            "filestore key must not contain '\\\\'".to_string(),
        ));
    }
    if key.split('/').any(|seg| seg == "..") {
        return Err(Error::InvalidInput(
            "filestore key must not contain '..' segments".to_string(),
        ));
    }
    Ok(())
}
