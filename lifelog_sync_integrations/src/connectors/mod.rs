//! Connectors for paginated record APIs.

pub mod limitless;
