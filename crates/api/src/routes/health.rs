//! Liveness endpoint for the platform's health checks.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::routes::events::FINALIZED_EVENT_TYPE;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "needu-sos-relay",
        "trigger": FINALIZED_EVENT_TYPE,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
