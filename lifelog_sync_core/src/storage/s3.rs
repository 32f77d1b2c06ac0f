use crate::config::S3Config;
use crate::storage::validate_key;
use crate::sync::traits::Filestore;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

/// S3 (or S3-compatible) bucket, optionally scoped under a key prefix.
#[derive(Clone)]
pub struct S3Filestore {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Filestore {
    #[tracing::instrument(level = "debug", skip(cfg), fields(bucket = %cfg.bucket))]
    pub async fn new(cfg: &S3Config) -> Result<Self> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

        if let (Some(id), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            let creds = Credentials::new(id.clone(), secret.clone(), None, None, "lifelog_sync_static");
            loader = loader.credentials_provider(creds);
        }
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let mut s3_cfg = aws_sdk_s3::config::Builder::from(&shared);
        if cfg.endpoint.is_some() {
            // MinIO-style endpoints need path-style addressing.
            s3_cfg = s3_cfg.force_path_style(true);
        }

        let prefix = cfg
            .prefix
            .as_deref()
            .map(|p| p.trim().trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            client: Client::from_conf(s3_cfg.build()),
            bucket: cfg.bucket.clone(),
            prefix,
        })
    }

    fn scoped(&self, key: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}/{key}"),
            None => key.to_string(),
        }
    }

    fn unscoped(&self, object_key: String) -> String {
        match &self.prefix {
            Some(p) => object_key
                .strip_prefix(p.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(str::to_string)
                .unwrap_or(object_key),
            None => object_key,
        }
    }
}

#[async_trait]
impl Filestore for S3Filestore {
    #[tracing::instrument(level = "debug", skip(self, data), fields(bytes = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.scoped(key))
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::backend("s3 put_object", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !prefix.is_empty() {
            validate_key(prefix)?;
        }
        let scoped_prefix = match &self.prefix {
            Some(p) => format!("{p}/{prefix}"),
            None => prefix.to_string(),
        };

        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&scoped_prefix);
            if let Some(t) = token.take() {
                req = req.continuation_token(t);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| Error::backend("s3 list_objects_v2", e))?;

            for obj in resp.contents.unwrap_or_default() {
                if let Some(k) = obj.key {
                    keys.push(self.unscoped(k));
                }
            }

            if resp.is_truncated.unwrap_or(false) {
                token = resp.next_continuation_token;
                if token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        keys.sort();
        Ok(keys)
    }
}
