use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Sort order requested from the remote API. Only ascending is used.
pub const DIRECTION_ASC: &str = "asc";

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub start: String,
    pub end: String,
    pub timezone: String,
    /// Absent on the first request of a run.
    pub cursor: Option<String>,
    pub direction: &'static str,
    pub limit: u32,
}

impl PageRequest {
    /// Query pairs in wire order; `cursor` is omitted when absent.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("start", self.start.clone()),
            ("end", self.end.clone()),
            ("timezone", self.timezone.clone()),
        ];
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs.push(("direction", self.direction.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// Remote source of paginated records.
///
/// Implementations perform exactly one request per call and never retry;
/// the fetcher owns the retry policy. A non-2xx response must surface as
/// `Error::HttpStatus`, a 2xx body that cannot be decoded as `Error::Protocol`.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get_page(&self, request: &PageRequest) -> Result<serde_json::Value>;
}

/// Object / file storage (S3-compatible).
#[async_trait]
pub trait Filestore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Keys under `prefix`, sorted lexically.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
