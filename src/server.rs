use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the read-only report API.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Reports ─────────────────────────────────────────────
        .route("/api/reports", get(handlers::reports::list_reports))
        .route("/api/reports/:name", get(handlers::reports::get_report))
        // ── Endpoints, by composite key ─────────────────────────
        .route("/api/endpoints/:key", get(handlers::reports::get_endpoint))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
