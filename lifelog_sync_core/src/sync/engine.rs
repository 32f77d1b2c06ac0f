use crate::config::SyncConfig;
use crate::models::Window;
use crate::sync::fetcher::PaginatedFetcher;
use crate::sync::models::{FetchTermination, RunSummary};
use crate::sync::repartitioner::{BatchRepartitioner, ChunkKeys};
use crate::sync::traits::{Filestore, PageTransport};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One catch-up sync: fetch every page of the window, persist it in chunks.
pub struct SyncJob {
    transport: Arc<dyn PageTransport>,
    filestore: Arc<dyn Filestore>,
    config: SyncConfig,
}

impl SyncJob {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(
        transport: Arc<dyn PageTransport>,
        filestore: Arc<dyn Filestore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            transport,
            filestore,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs against the window `[window_start, now)`.
    ///
    /// Fetch and upload failures are reported in the summary rather than
    /// returned; only an unusable window is an error.
    #[tracing::instrument(level = "info", skip(self), fields(run_started_at = %now))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let window = Window::new(self.config.window_start, now)?;
        self.run_window(window, now).await
    }

    /// Like [`SyncJob::run`] but with an explicit lower bound.
    #[tracing::instrument(level = "info", skip(self), fields(run_started_at = %now))]
    pub async fn run_from(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> Result<RunSummary> {
        let window = Window::new(start, now)?;
        self.run_window(window, now).await
    }

    async fn run_window(&self, window: Window, now: DateTime<Utc>) -> Result<RunSummary> {
        tracing::info!(
            start = %window.start_param(),
            end = %window.end_param(),
            chunk_size = self.config.batch.chunk_size,
            "sync run starting"
        );

        let keys = ChunkKeys::new(&self.config.batch.key_stem, now);
        let mut fetcher = PaginatedFetcher::new(
            self.transport.as_ref(),
            &self.config.fetch,
            &self.config.api.collection,
            window,
        );
        let mut repartitioner =
            BatchRepartitioner::new(self.filestore.as_ref(), keys, self.config.batch.chunk_size);

        while let Some(page) = fetcher.next_page().await {
            repartitioner.push_page(page).await;
        }
        let report = repartitioner.finish().await;

        // next_page only returns None once a termination is recorded.
        let termination = fetcher
            .termination()
            .cloned()
            .unwrap_or(FetchTermination::Completed {
                pages: fetcher.pages_fetched(),
            });

        let summary = RunSummary {
            run_started_at: now,
            window,
            pages_fetched: fetcher.pages_fetched(),
            records_fetched: fetcher.records_fetched(),
            termination,
            report,
        };
        tracing::info!(
            pages_fetched = summary.pages_fetched,
            records_fetched = summary.records_fetched,
            records_uploaded = summary.report.records_uploaded,
            chunks_failed = summary.report.chunks_failed,
            completed = summary.termination.is_completed(),
            "sync run finished"
        );
        Ok(summary)
    }
}
