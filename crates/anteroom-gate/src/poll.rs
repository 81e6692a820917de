//! The client poll check: `GET /client`.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::cookie::auth_token;
use crate::{GateState, apply_cors};

/// Body of a poll-check response.
#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Answer "has my token been admitted?". Read-only.
///
/// A missing or malformed cookie means "not admitted", not an error —
/// the client simply keeps polling. A store failure is logged and
/// surfaced as a 500, which the polling page also treats as "keep
/// waiting".
pub async fn client_check(State(state): State<GateState>, headers: HeaderMap) -> Response {
    let mut response = match auth_token(&headers) {
        None => denied(StatusCode::OK),
        Some(token) => match state.store.get_entry(&token) {
            Ok(Some(entry)) => Json(PollResponse {
                allow: entry.allow,
                origin: Some(state.protect_url.clone()),
            })
            .into_response(),
            Ok(None) => denied(StatusCode::OK),
            Err(e) => {
                error!(error = %e, "allow-list lookup failed");
                denied(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
    };
    apply_cors(&mut response, &state.waiting_room_url);
    response
}

fn denied(status: StatusCode) -> Response {
    (
        status,
        Json(PollResponse {
            allow: false,
            origin: None,
        }),
    )
        .into_response()
}
