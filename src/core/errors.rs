use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures while loading the chunk store from disk.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chunk store not found at {}; run the ingest step first", .0.display())]
    NotFound(std::path::PathBuf),
    #[error("failed to read chunk store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse chunk store: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures surfaced by the retriever. `NotInitialized` is the only
/// condition allowed to fail a query; everything downstream degrades
/// instead of erroring.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("index not loaded; call reload first")]
    NotInitialized,
}

/// Failures at the generation boundary. Never retried here and never
/// surfaced to callers: every kind degrades to the local fallback.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("authentication rejected by provider")]
    Auth,
    #[error("rate limited by provider")]
    RateLimit,
    #[error("generation timed out")]
    Timeout,
    #[error("provider error: {0}")]
    Provider(String),
    #[error("provider returned an empty completion")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    #[allow(dead_code)]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::NotInitialized => ApiError::ServiceUnavailable,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
