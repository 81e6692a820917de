//! The admission gate: `GET /enter`.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use anteroom_core::token;

use crate::cookie::{auth_token, set_cookie_value};
use crate::{GateState, apply_cors};

/// Admit a visitor into the waiting room.
///
/// First visit (no session cookie): mint a token, enqueue it, and bind
/// the visitor to it with a Set-Cookie header. Returning visitors keep
/// their token — no new enqueue. Both cases redirect to the
/// waiting-room page.
///
/// If the enqueue fails the gate must not issue a cookie for a token
/// that was never queued, so it answers 500 instead of pretending.
pub async fn enter(State(state): State<GateState>, headers: HeaderMap) -> Response {
    let mut response = match auth_token(&headers) {
        Some(_) => {
            debug!("returning visitor, session cookie already present");
            redirect(&state.waiting_room_url, None)
        }
        None => {
            let token = token::generate();
            match state.queue.send(token.clone()) {
                Ok(message_id) => {
                    debug!(%message_id, "new visitor token enqueued");
                    redirect(&state.waiting_room_url, Some(&token))
                }
                Err(e) => {
                    error!(error = %e, "enqueue failed, refusing to issue cookie");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "admission queue unavailable",
                    )
                        .into_response()
                }
            }
        }
    };
    apply_cors(&mut response, &state.waiting_room_url);
    response
}

fn redirect(waiting_room_url: &str, token: Option<&str>) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(location) = HeaderValue::from_str(waiting_room_url) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    if let Some(token) = token
        && let Ok(cookie) = HeaderValue::from_str(&set_cookie_value(token))
    {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}
