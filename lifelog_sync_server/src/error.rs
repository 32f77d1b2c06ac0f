use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifelog_sync_core::error as core_error;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("a sync run is already in progress")]
    RunInProgress,

    #[error("{0}")]
    Core(#[from] lifelog_sync_core::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RunInProgress => StatusCode::CONFLICT,
            ApiError::Core(err) => match err {
                core_error::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                core_error::Error::Conflict(_) => StatusCode::CONFLICT,
                core_error::Error::HttpStatus { .. }
                | core_error::Error::Protocol(_)
                | core_error::Error::Backend { .. }
                | core_error::Error::BackendMessage(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (code, Json(body)).into_response()
    }
}
