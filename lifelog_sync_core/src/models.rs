use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One opaque entry pulled from the remote source.
///
/// The payload is never interpreted; it is persisted exactly as received.
/// Key order and integer precision survive because `serde_json` is built with
/// `preserve_order` and `arbitrary_precision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub payload: serde_json::Value,
}

impl Record {
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }
}

/// Records returned by one successful API call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based request counter for the run (diagnostics only).
    pub index: u32,
    pub records: Vec<Record>,
    /// Continuation token returned alongside the records.
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Query range for a whole run (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    #[tracing::instrument(level = "debug")]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidInput(format!(
                "window start {} must be before end {}",
                format_timestamp(start),
                format_timestamp(end)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `start` as sent on the wire, e.g. `2025-03-13T00:00:00Z`.
    pub fn start_param(&self) -> String {
        format_timestamp(self.start)
    }

    pub fn end_param(&self) -> String {
        format_timestamp(self.end)
    }
}

/// A bounded group of records persisted as one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 1-based, contiguous within a run.
    pub index: u32,
    pub key: String,
    pub records: Vec<Record>,
}

impl Chunk {
    /// Serialized object body: a pretty-printed JSON array of the records.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.records).map_err(|e| Error::backend("serialize chunk", e))
    }
}

/// ISO-8601 UTC with a trailing `Z` and second precision.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 timestamp in any offset and normalizes it to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("invalid timestamp '{value}': {e}")))
}
