use std::error::Error as StdError;

/// Common error type for `lifelog_sync_core`.
///
/// Storage and transport implementations should preserve the underlying
/// error chain where possible via `Error::backend`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("remote returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("backend error: {0}")]
    BackendMessage(String),
}

impl Error {
    #[tracing::instrument(level = "debug", name = "lifelog_sync.error.backend", skip(source))]
    pub fn backend(
        context: impl Into<String> + std::fmt::Debug,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Convenience: wrap any error into `Backend` with "reqwest" context.
    pub fn backend_reqwest(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Backend {
            context: "reqwest".into(),
            source: Box::new(source),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures and non-2xx responses are transient; a malformed
    /// response envelope or bad input is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::HttpStatus { .. } | Error::Backend { .. } | Error::BackendMessage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
