//! HTTP API routes for the chat server
//!
//! `POST /api/chat` streams a turn as server-sent events; history and clear
//! are plain request/response calls over the canonical log.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

pub mod chat;
pub mod history;

use crate::app_state::AppState;

#[derive(Clone)]
pub struct ApiState {
    pub app_state: AppState,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat::chat))
        .route("/api/history", get(history::get_history))
        .route("/api/clear", post(history::clear_history))
}

/// Health check endpoint
pub async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "chat-server"
        })),
    )
}
