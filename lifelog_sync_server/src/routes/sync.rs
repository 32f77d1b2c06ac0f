use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Query;
use axum::routing::post;
use axum::{Extension, Json};
use chrono::Utc;
use lifelog_sync_core::TriggerResponse;
use lifelog_sync_core::models::parse_timestamp;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    /// Overrides the configured window start for this run only.
    #[serde(default)]
    pub start: Option<String>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new().route("/sync/run", post(run_sync))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn run_sync(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<RunParams>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let start = match params.start.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_timestamp(s)?),
        _ => None,
    };
    let _guard = state
        .run_lock
        .try_lock()
        .map_err(|_| ApiError::RunInProgress)?;

    let now = Utc::now();
    let summary = match start {
        Some(start) => state.job.run_from(start, now).await?,
        None => state.job.run(now).await?,
    };
    Ok(Json(TriggerResponse::from_summary(summary)))
}
