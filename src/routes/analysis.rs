use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::analysis;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tinkoff::TinkoffClient;

// ── Query params ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TickerQuery {
    #[serde(default)]
    ticker: Option<String>,
}

impl TickerQuery {
    /// Missing or blank tickers 400 with the exact body long-standing
    /// clients expect.
    fn require(self) -> Result<String, ApiError> {
        self.ticker
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::warn!("request rejected: no ticker supplied");
                ApiError::BadRequest("Ticker is required".to_string())
            })
    }
}

// ── Route definitions ────────────────────────────────────────────────────

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/anomalous_volumes", get(anomalous_volumes))
        .route("/anomalous_limits", get(anomalous_limits))
        .route("/net_flow", get(net_flow))
        .route("/short_squeeze", get(short_squeeze))
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn anomalous_volumes(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<Value>, ApiError> {
    let ticker = q.require()?;
    let client = TinkoffClient::new(&state.config);
    let report = analysis::anomalous_volumes(&client, &ticker).await;
    Ok(Json(report.into_json()))
}

async fn anomalous_limits(
    State(_state): State<Arc<AppState>>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<Value>, ApiError> {
    let ticker = q.require()?;
    Ok(Json(analysis::anomalous_limits(&ticker)))
}

async fn net_flow(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<Value>, ApiError> {
    let ticker = q.require()?;
    let client = TinkoffClient::new(&state.config);
    let report = analysis::net_flow(&client, &ticker).await;
    Ok(Json(report.into_json()))
}

async fn short_squeeze(
    State(_state): State<Arc<AppState>>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<Value>, ApiError> {
    let ticker = q.require()?;
    Ok(Json(analysis::short_squeeze(&ticker)))
}
