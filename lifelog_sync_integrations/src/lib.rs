//! Remote API connectors implementing `lifelog_sync_core::PageTransport`.

pub mod connectors;

pub use connectors::limitless::LimitlessClient;
