use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn reload_index(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.search.reload().await?;
    Ok(Json(json!({
        "chunks": report.chunks,
        "skipped": report.skipped
    })))
}
