//! The worker's small HTTP surface (§6): a health probe and the two
//! endpoints that let the authoring app drive work directly instead of
//! waiting for the queue/DB poll to notice it — `/render` and
//! `/generate-renditions`.

pub mod auth;
pub mod health;
pub mod render;
pub mod renditions;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Request bodies beyond this are rejected before hitting a handler —
/// these routes only ever carry small JSON payloads, never media bytes.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/render", post(render::render))
        .route("/generate-renditions", post(renditions::generate_renditions))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_shared_secret));

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
