//! Bearer-token auth for the direct-invocation routes (§6.1). This worker
//! is only ever reachable from the authoring app's backend, not from end
//! user browsers, so a single shared secret is enough — there's no user
//! identity to carry through.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use axum::Json;

use super::state::AppState;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorBody { detail: detail.to_string() })).into_response()
}

pub async fn require_shared_secret(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let Some(expected) = &state.shared_secret else {
        // No secret configured: treat as open, matching local/dev setups
        // that never set RENDER_WORKER_SHARED_SECRET.
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => next.run(request).await,
        Some(_) => unauthorized("invalid bearer token"),
        None => unauthorized("missing bearer token"),
    }
}

/// Compares two byte strings in time independent of where they first
/// differ, so a timing side-channel can't be used to guess the secret one
/// byte at a time.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_compare_equal() {
        assert!(constant_time_eq(b"secret-token", b"secret-token"));
    }

    #[test]
    fn different_strings_compare_unequal() {
        assert!(!constant_time_eq(b"secret-token", b"secret-tokeX"));
    }

    #[test]
    fn different_lengths_compare_unequal() {
        assert!(!constant_time_eq(b"short", b"much-longer-token"));
    }
}
