use axum::Router;

pub mod health;
pub mod sync;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().nest("/v1", sync::router())
}
