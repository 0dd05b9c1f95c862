//! Endpoint-level tests driving requests through the router in-process.
//! The upstream base URL points at a port nothing listens on, so every
//! candle fetch exercises the fail-soft path deterministically.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use anomaly_hub::config::HubConfig;
use anomaly_hub::state::AppState;

const FIND_INSTRUMENT: &str =
    "/tinkoff.public.invest.api.contract.v1.InstrumentsService/FindInstrument";
const GET_CANDLES: &str =
    "/tinkoff.public.invest.api.contract.v1.MarketDataService/GetCandles";

fn app_with_base(api_base: &str) -> axum::Router {
    let cfg = HubConfig {
        bind: "127.0.0.1".to_string(),
        port: 0,
        token: "test-token".to_string(),
        api_base: api_base.to_string(),
    };
    anomaly_hub::app(AppState::new(cfg))
}

fn test_app() -> axum::Router {
    // Nothing listens on the discard port, so fetches fail in transport.
    app_with_base("http://127.0.0.1:9")
}

/// Serve a stub upstream on an ephemeral port and return its base URL.
async fn spawn_upstream(stub: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });
    format!("http://{addr}")
}

fn quote(units: i64) -> Value {
    json!({ "units": units.to_string(), "nano": 0 })
}

fn candle_json(volume: i64) -> Value {
    json!({
        "open": quote(100),
        "high": quote(101),
        "low": quote(99),
        "close": quote(100),
        "volume": volume.to_string(),
        "time": "2024-05-01T10:00:00Z",
        "isComplete": true
    })
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn missing_ticker_is_rejected_on_every_endpoint() {
    for path in [
        "/anomalous_volumes",
        "/anomalous_limits",
        "/net_flow",
        "/short_squeeze",
    ] {
        let (status, body) = get(test_app(), path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body, json!({ "error": "Ticker is required" }), "{path}");
    }
}

#[tokio::test]
async fn blank_ticker_is_rejected() {
    let (status, body) = get(test_app(), "/net_flow?ticker=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Ticker is required" }));
}

#[tokio::test]
async fn placeholder_endpoints_return_fixed_payloads() {
    let (status, body) = get(test_app(), "/anomalous_limits?ticker=SBER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "anomalous_limits": "not implemented" }));

    let (status, body) = get(test_app(), "/short_squeeze?ticker=ANYTHING").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "short_squeeze": "not implemented" }));
}

#[tokio::test]
async fn unreachable_upstream_fails_soft_to_insufficient_data() {
    // No HTTP error status for upstream faults: availability over diagnostics.
    let (status, body) = get(test_app(), "/anomalous_volumes?ticker=SBER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "anomalous_volume": "insufficient data" }));

    let (status, body) = get(test_app(), "/net_flow?ticker=SBER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "net_flow": "insufficient data" }));
}

#[tokio::test]
async fn unknown_ticker_yields_insufficient_data_not_an_error() {
    // Upstream is reachable but no instrument matches: the not-found
    // branch must look the same to clients as a transport fault.
    let stub = Router::new().route(
        FIND_INSTRUMENT,
        post(|| async { Json(json!({ "instruments": [] })) }),
    );
    let base = spawn_upstream(stub).await;

    let (status, body) = get(app_with_base(&base), "/anomalous_volumes?ticker=NOSUCH").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "anomalous_volume": "insufficient data" }));

    let (status, body) = get(app_with_base(&base), "/net_flow?ticker=NOSUCH").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "net_flow": "insufficient data" }));
}

#[tokio::test]
async fn computed_report_flows_end_to_end() {
    let stub = Router::new()
        .route(
            FIND_INSTRUMENT,
            post(|| async {
                Json(json!({
                    "instruments": [{ "uid": "uid-1", "ticker": "SBER", "name": "Sberbank" }]
                }))
            }),
        )
        .route(
            GET_CANDLES,
            post(|Json(req): Json<Value>| async move {
                // The history fetch spans 30 days, the follow-up one hour;
                // tell them apart by the requested range.
                let from: DateTime<Utc> = req["from"].as_str().unwrap().parse().unwrap();
                let to: DateTime<Utc> = req["to"].as_str().unwrap().parse().unwrap();
                let candles = if to - from > Duration::days(1) {
                    vec![candle_json(10), candle_json(20), candle_json(30)]
                } else {
                    vec![candle_json(41)]
                };
                Json(json!({ "candles": candles }))
            }),
        );
    let base = spawn_upstream(stub).await;

    let (status, body) = get(app_with_base(&base), "/anomalous_volumes?ticker=SBER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "anomalous_volume": true,
            "current_volume": 41,
            "average_volume": 20.0,
        })
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = get(test_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
