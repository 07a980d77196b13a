//! Health check endpoints.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

async fn root() -> &'static str {
    "BWR API is running."
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "service": "bwr-backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
