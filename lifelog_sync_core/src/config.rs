use crate::models::parse_timestamp;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.limitless.ai/v1/lifelogs";
pub const DEFAULT_COLLECTION: &str = "lifelogs";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_WINDOW_START: &str = "2025-03-13T00:00:00Z";
pub const DEFAULT_KEY_STEM: &str = "lifelogs_catchup";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub url: String,
    pub api_key: String,
    /// Name of the record list under `data` and of the cursor object under `meta`.
    pub collection: String,
    pub timeout: Duration,
}

/// Knobs for the paginated fetch loop.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Named zone forwarded to the API; timestamps themselves are always UTC.
    pub timezone: String,
    pub page_limit: u32,
    /// Attempts per page, including the first one.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Pause between successive page requests.
    pub page_delay: Duration,
    /// Upper bound on page requests per run.
    pub max_pages: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            page_limit: 100,
            max_attempts: 5,
            retry_delay: Duration::from_secs(2),
            page_delay: Duration::from_secs(1),
            max_pages: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Maximum records per persisted object.
    pub chunk_size: usize,
    /// Leading part of every object name, before the run timestamp.
    pub key_stem: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            key_stem: DEFAULT_KEY_STEM.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Optional custom endpoint (e.g. MinIO).
    pub endpoint: Option<String>,
    /// Static credentials; when absent the default AWS provider chain is used.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Optional key prefix applied to every object.
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    S3(S3Config),
    Local { root_dir: PathBuf },
}

/// Everything a sync run depends on but does not define.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub batch: BatchConfig,
    /// Fixed lower bound of every run's window; the upper bound is the wall clock.
    pub window_start: DateTime<Utc>,
    pub storage: StorageConfig,
}

impl SyncConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source (process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("LIFELOG_SYNC_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or_else(|| Error::InvalidInput("LIFELOG_SYNC_API_KEY is required".to_string()))?;
        let api = ApiConfig {
            url: get("LIFELOG_SYNC_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            collection: get("LIFELOG_SYNC_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            timeout: Duration::from_millis(parse_number(
                &get,
                "LIFELOG_SYNC_HTTP_TIMEOUT_MS",
                30_000,
            )?),
        };

        let defaults = FetchConfig::default();
        let fetch = FetchConfig {
            page_limit: parse_number(&get, "LIFELOG_SYNC_PAGE_LIMIT", defaults.page_limit)?,
            max_attempts: parse_number(&get, "LIFELOG_SYNC_RETRY_LIMIT", defaults.max_attempts)?,
            retry_delay: Duration::from_millis(parse_number(
                &get,
                "LIFELOG_SYNC_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
            page_delay: Duration::from_millis(parse_number(
                &get,
                "LIFELOG_SYNC_PAGE_DELAY_MS",
                defaults.page_delay.as_millis() as u64,
            )?),
            max_pages: parse_number(&get, "LIFELOG_SYNC_MAX_PAGES", defaults.max_pages)?,
            timezone: get("LIFELOG_SYNC_TIMEZONE").unwrap_or(defaults.timezone),
        };

        let batch = BatchConfig {
            chunk_size: parse_number(&get, "LIFELOG_SYNC_CHUNK_SIZE", 500usize)?,
            key_stem: get("LIFELOG_SYNC_KEY_STEM").unwrap_or_else(|| DEFAULT_KEY_STEM.to_string()),
        };

        let window_start = parse_timestamp(
            &get("LIFELOG_SYNC_WINDOW_START").unwrap_or_else(|| DEFAULT_WINDOW_START.to_string()),
        )?;

        let storage = match get("LIFELOG_SYNC_LOCAL_DIR") {
            Some(dir) => StorageConfig::Local {
                root_dir: PathBuf::from(dir),
            },
            None => {
                let bucket = get("LIFELOG_SYNC_S3_BUCKET")
                    .or_else(|| get("BUCKET_NAME"))
                    .ok_or_else(|| {
                        Error::InvalidInput(
                            "LIFELOG_SYNC_S3_BUCKET is required unless LIFELOG_SYNC_LOCAL_DIR is set"
                                .to_string(),
                        )
                    })?;
                StorageConfig::S3(S3Config {
                    bucket,
                    region: get("LIFELOG_SYNC_S3_REGION")
                        .or_else(|| get("AWS_REGION"))
                        .unwrap_or_else(|| "us-east-1".to_string()),
                    endpoint: get("LIFELOG_SYNC_S3_ENDPOINT"),
                    access_key_id: get("LIFELOG_SYNC_S3_ACCESS_KEY_ID"),
                    secret_access_key: get("LIFELOG_SYNC_S3_SECRET_ACCESS_KEY"),
                    prefix: get("LIFELOG_SYNC_S3_PREFIX"),
                })
            }
        };

        let cfg = Self {
            api,
            fetch,
            batch,
            window_start,
            storage,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        if self.api.url.trim().is_empty() {
            return Err(Error::InvalidInput("api.url is empty".to_string()));
        }
        if self.api.api_key.trim().is_empty() {
            return Err(Error::InvalidInput("api.api_key is empty".to_string()));
        }
        if self.api.collection.trim().is_empty() {
            return Err(Error::InvalidInput("api.collection is empty".to_string()));
        }
        if self.api.timeout.is_zero() {
            return Err(Error::InvalidInput("api.timeout must be > 0".to_string()));
        }

        if self.fetch.timezone.trim().is_empty() {
            return Err(Error::InvalidInput("fetch.timezone is empty".to_string()));
        }
        if self.fetch.page_limit == 0 {
            return Err(Error::InvalidInput(
                "fetch.page_limit must be > 0".to_string(),
            ));
        }
        if self.fetch.max_attempts == 0 {
            return Err(Error::InvalidInput(
                "fetch.max_attempts must be > 0".to_string(),
            ));
        }
        if self.fetch.max_pages == 0 {
            return Err(Error::InvalidInput("fetch.max_pages must be > 0".to_string()));
        }

        if self.batch.chunk_size == 0 {
            return Err(Error::InvalidInput(
                "batch.chunk_size must be > 0".to_string(),
            ));
        }
        if self.batch.key_stem.trim().is_empty() || self.batch.key_stem.contains('/') {
            return Err(Error::InvalidInput(
                "batch.key_stem must be non-empty and contain no '/'".to_string(),
            ));
        }

        match &self.storage {
            StorageConfig::S3(s3) => {
                if s3.bucket.trim().is_empty() {
                    return Err(Error::InvalidInput("s3.bucket is empty".to_string()));
                }
                if s3.region.trim().is_empty() {
                    return Err(Error::InvalidInput("s3.region is empty".to_string()));
                }
                if s3.access_key_id.is_some() != s3.secret_access_key.is_some() {
                    return Err(Error::InvalidInput(
                        "s3 static credentials need both access_key_id and secret_access_key"
                            .to_string(),
                    ));
                }
            }
            StorageConfig::Local { root_dir } => {
                if root_dir.as_os_str().is_empty() {
                    return Err(Error::InvalidInput("local.root_dir is empty".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Config as JSON with credentials masked.
    pub fn redacted(&self) -> serde_json::Value {
        let storage = match &self.storage {
            StorageConfig::S3(s3) => serde_json::json!({
                "kind": "s3",
                "bucket": s3.bucket,
                "region": s3.region,
                "endpoint": s3.endpoint,
                "prefix": s3.prefix,
                "access_key_id": s3.access_key_id.as_deref().map(redact),
                "secret_access_key": s3.secret_access_key.as_deref().map(|_| "***"),
            }),
            StorageConfig::Local { root_dir } => serde_json::json!({
                "kind": "local",
                "root_dir": root_dir.display().to_string(),
            }),
        };
        serde_json::json!({
            "api": {
                "url": self.api.url,
                "api_key": redact(&self.api.api_key),
                "collection": self.api.collection,
                "timeout_ms": self.api.timeout.as_millis() as u64,
            },
            "fetch": {
                "timezone": self.fetch.timezone,
                "page_limit": self.fetch.page_limit,
                "max_attempts": self.fetch.max_attempts,
                "retry_delay_ms": self.fetch.retry_delay.as_millis() as u64,
                "page_delay_ms": self.fetch.page_delay.as_millis() as u64,
                "max_pages": self.fetch.max_pages,
            },
            "batch": {
                "chunk_size": self.batch.chunk_size,
                "key_stem": self.batch.key_stem,
            },
            "window_start": crate::models::format_timestamp(self.window_start),
            "storage": storage,
        })
    }
}

/// Parses a numeric variable at its target width; unset means `default`.
fn parse_number<T>(get: impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::InvalidInput(format!("{name}='{raw}': {e}"))),
    }
}

fn redact(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}
