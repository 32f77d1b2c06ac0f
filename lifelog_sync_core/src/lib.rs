//! Lifelog sync core: models, config and the fetch/repartition pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod o11y;
pub mod storage;
pub mod sync;

pub use config::{ApiConfig, BatchConfig, FetchConfig, S3Config, StorageConfig, SyncConfig};
pub use error::{Error, Result};
pub use models::{Chunk, Page, Record, Window};
pub use storage::{LocalFilestore, S3Filestore, build_filestore};
pub use sync::{
    Filestore, FetchTermination, PageRequest, PageTransport, RepartitionReport, RunSummary,
    SyncJob, TriggerResponse,
};
