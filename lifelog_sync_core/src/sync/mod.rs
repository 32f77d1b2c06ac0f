//! Catch-up sync: paginated fetch, repartitioning and the run orchestration.

pub mod engine;
pub mod fetcher;
pub mod models;
pub mod repartitioner;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::SyncJob;
pub use fetcher::{PaginatedFetcher, parse_envelope};
pub use models::{FetchTermination, RepartitionReport, RunSummary, TriggerResponse};
pub use repartitioner::{BatchRepartitioner, ChunkKeys};
pub use traits::{DIRECTION_ASC, Filestore, PageRequest, PageTransport};
