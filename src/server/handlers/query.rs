use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    question: Option<String>,
    /// Short alias accepted for convenience.
    #[serde(default)]
    q: Option<String>,
}

pub async fn post_query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = body
        .question
        .or(body.q)
        .unwrap_or_default()
        .trim()
        .to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Missing question".to_string()));
    }

    let normalized = state.pipeline.answer(&question).await?;
    let messages = normalized.answer.messages();

    Ok(Json(json!({
        "answer": normalized.answer,
        "messages": messages,
        "sources": normalized.sources,
        "origin": normalized.origin,
    })))
}
