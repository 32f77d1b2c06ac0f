//! Limitless lifelog API connector.
//!
//! One GET per page against the configured endpoint, authenticated with the
//! `X-API-Key` header. Retries and cursor handling live in the core fetcher.

use async_trait::async_trait;
use lifelog_sync_core::config::ApiConfig;
use lifelog_sync_core::sync::{PageRequest, PageTransport};
use lifelog_sync_core::{Error, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::instrument;

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
/// Error bodies are kept for diagnostics but truncated to this many bytes.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct LimitlessClient {
    client: Client,
    url: String,
    headers: HeaderMap,
}

impl LimitlessClient {
    #[instrument(level = "debug", skip(cfg), fields(url = %cfg.url))]
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::backend("build http client", e))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("lifelog_sync"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(&cfg.api_key)
            .map_err(|e| Error::InvalidInput(format!("api key is not a valid header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        Ok(Self {
            client,
            url: cfg.url.clone(),
            headers,
        })
    }
}

#[async_trait]
impl PageTransport for LimitlessClient {
    #[instrument(level = "debug", skip(self, request), fields(cursor = ?request.cursor))]
    async fn get_page(&self, request: &PageRequest) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(&self.url)
            .headers(self.headers.clone())
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(Error::backend_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Error::backend_reqwest)?;
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::Protocol(format!(
                "response body is not valid json ({e}): {}",
                truncate(&text, MAX_ERROR_BODY)
            ))
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
