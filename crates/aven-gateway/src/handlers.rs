use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::oneshot;

use super::server::{AppState, ChatRequest};

pub(crate) const NO_INPUT: &str = "No input provided";

#[derive(serde::Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(serde::Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

/// Non-blank string `input` of a chat body.
pub(crate) fn extract_input(body: &serde_json::Value) -> Option<&str> {
    body.get("input")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            tracing::debug!("rejected chat body: {rejection}");
            return error(StatusCode::BAD_REQUEST, NO_INPUT);
        }
    };
    let Some(input) = extract_input(&body) else {
        return error(StatusCode::BAD_REQUEST, NO_INPUT);
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let request = ChatRequest {
        input: input.to_owned(),
        reply: reply_tx,
    };
    if state.chat_tx.send(request).await.is_err() {
        tracing::error!("chat worker is gone");
        return error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }

    match reply_rx.await {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(_) => {
            tracing::error!("chat worker dropped the request without replying");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
