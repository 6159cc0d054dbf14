//! Chat endpoint - one turn streamed as server-sent events
//!
//! Request validation happens before the stream opens and is the only place
//! a turn can fail with a non-2xx status. Once the response starts, failures
//! arrive as an `error` event.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{Stream, StreamExt};
use shared_types::{ChatRequest, ErrorResponse, StreamEvent};
use tokio::sync::mpsc;

use super::ApiState;
use crate::stream::{run_turn, EVENT_BUFFER};

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn to_sse(event: StreamEvent) -> Event {
    match Event::default().json_data(&event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode stream event");
            Event::default().data(r#"{"type":"error","message":"failed to encode event"}"#)
        }
    }
}

fn event_stream(rx: mpsc::Receiver<StreamEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .map(|event| Ok(to_sse(event)))
}

/// Send a message to the agent and stream the response.
pub async fn chat(
    State(state): State<ApiState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected chat request body");
            return bad_request("Invalid request body");
        }
    };

    if request.message.trim().is_empty() {
        return bad_request("message is required");
    }

    tracing::info!(chars = request.message.chars().count(), "Starting chat turn");

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(run_turn(state.app_state.clone(), request.message, tx));

    let mut response = Sse::new(event_stream(rx))
        .keep_alive(KeepAlive::default())
        .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
