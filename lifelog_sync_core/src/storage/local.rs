use crate::storage::validate_key;
use crate::sync::traits::Filestore;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

/// Directory-backed filestore for local runs and development.
#[derive(Clone)]
pub struct LocalFilestore {
    root: PathBuf,
}

impl LocalFilestore {
    #[tracing::instrument(level = "debug")]
    pub async fn new(root: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::backend("create filestore root", e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl Filestore for LocalFilestore {
    #[tracing::instrument(level = "debug", skip_all, fields(key))]
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::backend("create filestore dir", e))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| Error::backend("filestore write", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(prefix))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let mut rd = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::backend("filestore read_dir", e)),
            };
            while let Some(ent) = rd
                .next_entry()
                .await
                .map_err(|e| Error::backend("filestore next_entry", e))?
            {
                let path = ent.path();
                let meta = ent
                    .metadata()
                    .await
                    .map_err(|e| Error::backend("filestore metadata", e))?;
                if meta.is_dir() {
                    stack.push(path);
                } else if meta.is_file() {
                    if let Ok(rel) = path.strip_prefix(&self.root) {
                        let key = rel.to_string_lossy().replace('\\', "/");
                        if key.starts_with(prefix) {
                            out.push(key);
                        }
                    }
                }
            }
        }
        out.sort();
        Ok(out)
    }
}
