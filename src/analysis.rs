use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::tinkoff::{Candle, CandleInterval, TinkoffClient};

/// Current-period volume strictly above this multiple of the trailing
/// average counts as anomalous.
const ANOMALY_FACTOR: f64 = 2.0;

/// Outcome of the anomalous-volume computation.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeReport {
    Computed {
        anomalous: bool,
        current_volume: i64,
        average_volume: f64,
    },
    InsufficientData,
    CalculationError,
}

impl VolumeReport {
    /// JSON body, wire-compatible with the original service: computed
    /// results carry all three fields, failures collapse to a sentinel
    /// string under the same key.
    pub fn into_json(self) -> Value {
        match self {
            Self::Computed {
                anomalous,
                current_volume,
                average_volume,
            } => json!({
                "anomalous_volume": anomalous,
                "current_volume": current_volume,
                "average_volume": average_volume,
            }),
            Self::InsufficientData => json!({ "anomalous_volume": "insufficient data" }),
            Self::CalculationError => json!({ "anomalous_volume": "calculation error" }),
        }
    }
}

/// Net buy/sell flow. The indicator body is not implemented; only the
/// data-availability check is real.
#[derive(Debug, Clone, PartialEq)]
pub enum NetFlowReport {
    InsufficientData,
    NotCalculated,
    CalculationError,
}

impl NetFlowReport {
    pub fn into_json(self) -> Value {
        match self {
            Self::InsufficientData => json!({ "net_flow": "insufficient data" }),
            Self::NotCalculated => json!({ "net_flow": "not calculated" }),
            Self::CalculationError => json!({ "net_flow": "calculation error" }),
        }
    }
}

fn average_volume(candles: &[Candle]) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }
    let total: i64 = candles.iter().map(|c| c.volume).sum();
    Some(total as f64 / candles.len() as f64)
}

fn is_anomalous(current: i64, average: f64) -> bool {
    current as f64 > average * ANOMALY_FACTOR
}

/// Assemble a report from the two candle windows. Empty history
/// short-circuits before any division; an empty latest window means a
/// current volume of zero.
pub fn volume_report(history: &[Candle], latest: &[Candle]) -> VolumeReport {
    let Some(average_volume) = average_volume(history) else {
        return VolumeReport::InsufficientData;
    };
    let current_volume = latest.first().map(|c| c.volume).unwrap_or(0);
    VolumeReport::Computed {
        anomalous: is_anomalous(current_volume, average_volume),
        current_volume,
        average_volume,
    }
}

/// Compare the latest hour's volume against the trailing 30-day hourly
/// average. The two upstream fetches run sequentially; the second is
/// skipped entirely when the history window comes back empty.
pub async fn anomalous_volumes(client: &TinkoffClient, ticker: &str) -> VolumeReport {
    let now = Utc::now();
    let history = client
        .fetch_candles(ticker, now - Duration::days(30), now, CandleInterval::Hour)
        .await;
    if history.is_empty() {
        tracing::warn!("no 30-day history for {ticker}, skipping anomaly check");
        return VolumeReport::InsufficientData;
    }

    let latest = client
        .fetch_candles(ticker, now - Duration::hours(1), now, CandleInterval::Hour)
        .await;

    let report = volume_report(&history, &latest);
    tracing::info!("computed anomalous volume for {ticker}");
    report
}

/// Net-flow indicator over the last 7 days of hourly candles.
pub async fn net_flow(client: &TinkoffClient, ticker: &str) -> NetFlowReport {
    let now = Utc::now();
    let candles = client
        .fetch_candles(ticker, now - Duration::days(7), now, CandleInterval::Hour)
        .await;
    if candles.is_empty() {
        tracing::warn!("no 7-day history for {ticker}, cannot derive net flow");
        return NetFlowReport::InsufficientData;
    }

    // TODO: actual buy/sell classification needs per-trade direction data.
    tracing::info!("net flow for {ticker}: not calculated");
    NetFlowReport::NotCalculated
}

/// Order-book limit anomaly. Needs depth-of-book data the hub does not
/// ingest; the route stays live with a fixed payload.
pub fn anomalous_limits(ticker: &str) -> Value {
    tracing::warn!("anomalous-limits analysis requested for {ticker} but not implemented");
    json!({ "anomalous_limits": "not implemented" })
}

/// Short-squeeze indicator. Needs short-interest data with no public
/// source; the route stays live with a fixed payload.
pub fn short_squeeze(ticker: &str) -> Value {
    tracing::warn!("short-squeeze analysis requested for {ticker} but not implemented");
    json!({ "short_squeeze": "not implemented" })
}
