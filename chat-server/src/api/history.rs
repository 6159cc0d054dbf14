//! History endpoints over the canonical conversation log

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use shared_types::HistoryResponse;

use super::ApiState;
use crate::actors::conversation::get_messages;

/// Get conversation history
pub async fn get_history(State(state): State<ApiState>) -> impl IntoResponse {
    match get_messages(&state.app_state.conversation()).await {
        Ok(messages) => (StatusCode::OK, Json(json!(HistoryResponse { messages }))),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load conversation history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// Clear conversation history and discard the agent
pub async fn clear_history(State(state): State<ApiState>) -> impl IntoResponse {
    match state.app_state.reset().await {
        Ok(dropped) => {
            tracing::info!(dropped, "History cleared");
            (
                StatusCode::OK,
                Json(json!({ "message": "History cleared" })),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to clear conversation history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
