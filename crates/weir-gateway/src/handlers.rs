// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook endpoints.
//!
//! The webhook handlers validate the target and the envelope shape, map the
//! payload, and hand the event to the ingress gate. Acceptance is the only
//! success outcome; storage health never shows through these endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use weir_core::event::{Direction, EventBody};
use weir_core::Event;
use weir_pipeline::health::HealthReporter;
use weir_pipeline::ingress::IngressGate;

use crate::mapper;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Submission handle into the pipeline.
    pub ingress: IngressGate,
    /// Read-only pipeline health.
    pub health: HealthReporter,
    /// Configured storage target names, in display order.
    pub targets: std::sync::Arc<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn accepted() -> Response {
    (StatusCode::OK, Json(AcceptedResponse { status: "accepted" })).into_response()
}

fn check_target(state: &AppState, target: &str) -> Result<(), Response> {
    if state.targets.iter().any(|t| t == target) {
        Ok(())
    } else {
        Err(error(
            StatusCode::NOT_FOUND,
            format!("unknown target `{target}`"),
        ))
    }
}

async fn handle_message(
    state: AppState,
    target: String,
    direction: Direction,
    body: Value,
) -> Response {
    if let Err(resp) = check_target(&state, &target) {
        return resp;
    }
    if body.is_null() {
        return error(StatusCode::BAD_REQUEST, "no data provided");
    }
    match mapper::map_message_event(direction, &body) {
        Ok(event) => {
            state
                .ingress
                .submit(Event::new(target, EventBody::Message(event)))
                .await;
            accepted()
        }
        Err(err) => error(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

/// POST /webhook/{target}/incoming
pub async fn post_incoming(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    handle_message(state, target, Direction::Incoming, body).await
}

/// POST /webhook/{target}/outgoing
pub async fn post_outgoing(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    handle_message(state, target, Direction::Outgoing, body).await
}

/// POST /webhook/{target}/lifecycle
///
/// Requires `event_type` to be `contact.lifecycle.updated`.
pub async fn post_lifecycle(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = check_target(&state, &target) {
        return resp;
    }
    if body.is_null() {
        return error(StatusCode::BAD_REQUEST, "no data provided");
    }
    let event_type = body.get("event_type").and_then(Value::as_str);
    if event_type != Some(mapper::LIFECYCLE_EVENT_TYPE) {
        return error(
            StatusCode::BAD_REQUEST,
            format!(
                "invalid event type, expected `{}`",
                mapper::LIFECYCLE_EVENT_TYPE
            ),
        );
    }
    match mapper::map_lifecycle_event(&body) {
        Ok(event) => {
            state
                .ingress
                .submit(Event::new(target, EventBody::Lifecycle(event)))
                .await;
            accepted()
        }
        Err(err) => error(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Response {
    Json(state.health.snapshot()).into_response()
}

#[derive(Debug, Serialize)]
struct IndexResponse {
    service: &'static str,
    version: &'static str,
    endpoints: Vec<String>,
}

/// GET /
///
/// Service banner listing the webhook endpoints for each configured target.
pub async fn get_index(State(state): State<AppState>) -> Response {
    let mut endpoints = Vec::new();
    for target in state.targets.iter() {
        for kind in ["incoming", "outgoing", "lifecycle"] {
            endpoints.push(format!("POST /webhook/{target}/{kind}"));
        }
    }
    endpoints.push("GET /health".to_string());
    Json(IndexResponse {
        service: "weir",
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
    })
    .into_response()
}
