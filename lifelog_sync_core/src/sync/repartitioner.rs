//! Regroups variable-size pages into bounded chunks and persists each one.

use crate::models::{Chunk, Page, Record};
use crate::sync::models::RepartitionReport;
use crate::sync::traits::Filestore;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Object naming for one run: `{stem}_{YYYYMMDDTHHMMSSZ}_part{NNNNNNNNNN}.json`.
///
/// The index is padded to the width of `u32::MAX`, so lexical key order is
/// chunk order for every index a run can produce. Keys are relative; any
/// bucket-level prefix is applied by the filestore.
#[derive(Debug, Clone)]
pub struct ChunkKeys {
    stem: String,
    run_stamp: String,
}

const INDEX_WIDTH: usize = 10;

impl ChunkKeys {
    pub fn new(stem: &str, run_started_at: DateTime<Utc>) -> Self {
        Self {
            stem: stem.to_string(),
            run_stamp: run_started_at.format("%Y%m%dT%H%M%SZ").to_string(),
        }
    }

    pub fn key_for(&self, index: u32) -> String {
        format!(
            "{}_part{index:0width$}.json",
            self.run_prefix(),
            width = INDEX_WIDTH
        )
    }

    /// Shared leading part of every key of the run.
    pub fn run_prefix(&self) -> String {
        format!("{}_{}", self.stem, self.run_stamp)
    }
}

/// Accumulates records across pages and writes a chunk every `bound` records.
///
/// Chunk uploads are independent: a failed write is logged and counted, the
/// remaining chunks are still attempted.
pub struct BatchRepartitioner<'a> {
    sink: &'a dyn Filestore,
    keys: ChunkKeys,
    bound: usize,
    buffer: Vec<Record>,
    next_index: u32,
    report: RepartitionReport,
}

impl<'a> BatchRepartitioner<'a> {
    pub fn new(sink: &'a dyn Filestore, keys: ChunkKeys, bound: usize) -> Self {
        let bound = bound.max(1);
        Self {
            sink,
            keys,
            bound,
            buffer: Vec::with_capacity(bound),
            next_index: 1,
            report: RepartitionReport::default(),
        }
    }

    /// Appends the page's records and flushes every full chunk.
    pub async fn push_page(&mut self, page: Page) {
        tracing::debug!(
            page_index = page.index,
            records = page.len(),
            buffered = self.buffer.len(),
            "accumulating page"
        );
        self.buffer.extend(page.records);
        while self.buffer.len() >= self.bound {
            let rest = self.buffer.split_off(self.bound);
            let full = std::mem::replace(&mut self.buffer, rest);
            self.flush(full).await;
        }
    }

    /// Flushes the remainder, if any, and returns the run's totals.
    pub async fn finish(mut self) -> RepartitionReport {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.flush(rest).await;
        }
        tracing::info!(
            chunks_attempted = self.report.chunks_attempted,
            chunks_uploaded = self.report.chunks_uploaded,
            chunks_failed = self.report.chunks_failed,
            records_uploaded = self.report.records_uploaded,
            "repartition finished"
        );
        self.report
    }

    async fn flush(&mut self, records: Vec<Record>) {
        let chunk = Chunk {
            index: self.next_index,
            key: self.keys.key_for(self.next_index),
            records,
        };
        self.next_index += 1;
        self.report.chunks_attempted += 1;
        let count = chunk.records.len() as u64;

        let result = match chunk.to_body() {
            Ok(body) => self.sink.put(&chunk.key, Bytes::from(body)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(chunk_index = chunk.index, key = %chunk.key, records = count, "chunk uploaded");
                self.report.chunks_uploaded += 1;
                self.report.records_uploaded += count;
                self.report.uploaded_keys.push(chunk.key);
            }
            Err(e) => {
                tracing::error!(chunk_index = chunk.index, key = %chunk.key, records = count, error = %e, "chunk upload failed");
                self.report.chunks_failed += 1;
                self.report.records_failed += count;
                self.report.failed_keys.push(chunk.key);
            }
        }
    }
}
