pub mod analysis;
pub mod config;
pub mod error;
pub mod routes;
pub mod serverless;
pub mod state;
pub mod telegram;
pub mod tinkoff;

use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the full application router. Shared by the standalone server and
/// the single-shot cloud-function handler.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::api_router())
        .route("/health", axum::routing::get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
