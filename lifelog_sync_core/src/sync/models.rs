use crate::models::Window;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the fetcher stopped producing pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchTermination {
    /// The remote signalled no further continuation.
    Completed { pages: u32 },
    /// A page failed on every attempt of its retry budget.
    RetriesExhausted {
        page_index: u32,
        attempts: u32,
        last_error: String,
    },
    /// The response envelope was malformed or the cursor did not advance.
    ProtocolViolation { page_index: u32, reason: String },
    /// The per-run page request cap was hit before the remote finished.
    PageLimitReached { max_pages: u32 },
}

impl FetchTermination {
    pub fn is_completed(&self) -> bool {
        matches!(self, FetchTermination::Completed { .. })
    }
}

/// Totals produced by the repartitioner for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepartitionReport {
    pub chunks_attempted: u32,
    pub chunks_uploaded: u32,
    pub chunks_failed: u32,
    pub records_uploaded: u64,
    pub records_failed: u64,
    pub uploaded_keys: Vec<String>,
    pub failed_keys: Vec<String>,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_started_at: DateTime<Utc>,
    pub window: Window,
    pub pages_fetched: u32,
    pub records_fetched: u64,
    pub termination: FetchTermination,
    #[serde(flatten)]
    pub report: RepartitionReport,
}

impl RunSummary {
    /// Human-readable one-line outcome.
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Fetched {} entries; uploaded {} entries in {} of {} chunks.",
            self.records_fetched,
            self.report.records_uploaded,
            self.report.chunks_uploaded,
            self.report.chunks_attempted,
        );
        match &self.termination {
            FetchTermination::Completed { .. } => {}
            FetchTermination::RetriesExhausted {
                page_index,
                attempts,
                ..
            } => msg.push_str(&format!(
                " Fetch stopped at page {page_index} after {attempts} failed attempts."
            )),
            FetchTermination::ProtocolViolation { page_index, reason } => msg.push_str(&format!(
                " Fetch stopped at page {page_index}: {reason}."
            )),
            FetchTermination::PageLimitReached { max_pages } => {
                msg.push_str(&format!(" Fetch stopped at the {max_pages} page limit."))
            }
        }
        msg
    }
}

/// Status code plus summary returned to whatever invoked the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status_code: u16,
    pub body: String,
    pub summary: RunSummary,
}

impl TriggerResponse {
    /// Runs always report success; partial failures show up in the counts.
    pub fn from_summary(summary: RunSummary) -> Self {
        Self {
            status_code: 200,
            body: summary.message(),
            summary,
        }
    }
}
