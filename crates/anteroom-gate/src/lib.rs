//! anteroom-gate — the waiting room's public HTTP surface.
//!
//! Two routes, both consumed by browsers:
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/enter` | Admission gate: issue a token, enqueue it, park the visitor |
//! | GET | `/client` | Poll check: has my token been admitted? |
//!
//! The waiting-room page polls `/client` with credentials until
//! `allow` flips to true, then navigates to `origin`.

pub mod cookie;
pub mod enter;
pub mod poll;

use axum::Router;
use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::get;

use anteroom_queue::MemoryQueue;
use anteroom_state::AdmissionStore;

/// Shared state for the gate handlers.
#[derive(Clone)]
pub struct GateState {
    pub queue: MemoryQueue,
    pub store: AdmissionStore,
    /// Waiting-room page URL; also the allowed CORS origin.
    pub waiting_room_url: String,
    /// Protected endpoint admitted clients navigate to.
    pub protect_url: String,
}

/// Build the gate router.
pub fn build_router(state: GateState) -> Router {
    Router::new()
        .route("/enter", get(enter::enter))
        .route("/client", get(poll::client_check))
        .with_state(state)
}

/// Apply the CORS headers every gate response carries. Credentials are
/// allowed, so the origin must be interpolated rather than wildcarded.
fn apply_cors(response: &mut Response, origin: &str) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert("access-control-allow-origin", value);
    }
    headers.insert(
        "access-control-allow-credentials",
        HeaderValue::from_static("true"),
    );
    headers.insert("access-control-allow-headers", HeaderValue::from_static("*"));
    headers.insert("access-control-allow-methods", HeaderValue::from_static("*"));
}
