use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::HubConfig;

const FIND_INSTRUMENT: &str =
    "/tinkoff.public.invest.api.contract.v1.InstrumentsService/FindInstrument";
const GET_CANDLES: &str =
    "/tinkoff.public.invest.api.contract.v1.MarketDataService/GetCandles";

/// Candle interval, wire-encoded the way the Invest API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    Hour,
    Day,
}

impl CandleInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "CANDLE_INTERVAL_1_MIN",
            Self::FiveMinutes => "CANDLE_INTERVAL_5_MIN",
            Self::FifteenMinutes => "CANDLE_INTERVAL_15_MIN",
            Self::Hour => "CANDLE_INTERVAL_HOUR",
            Self::Day => "CANDLE_INTERVAL_DAY",
        }
    }
}

/// Upstream fetch failure. `fetch_candles` collapses this to an empty
/// candle set at the JSON boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// One OHLCV bar. Read-only snapshot; nothing mutates or persists these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Tradable security resolved from a display ticker. `uid` is the stable
/// identifier the market-data service keys candles on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub uid: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub name: String,
}

// protobuf-JSON encodes int64 as a string; accept either form.
fn de_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }
    match Raw::deserialize(d)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Invest API decimal: whole `units` plus a `nano` fractional part.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Quotation {
    #[serde(deserialize_with = "de_i64", default)]
    pub units: i64,
    #[serde(default)]
    pub nano: i32,
}

impl Quotation {
    pub fn to_f64(self) -> f64 {
        self.units as f64 + f64::from(self.nano) / 1e9
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoricCandle {
    time: DateTime<Utc>,
    open: Quotation,
    high: Quotation,
    low: Quotation,
    close: Quotation,
    #[serde(deserialize_with = "de_i64", default)]
    volume: i64,
}

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<HistoricCandle>,
}

#[derive(Debug, Deserialize)]
struct InstrumentsResponse {
    #[serde(default)]
    instruments: Vec<Instrument>,
}

#[derive(Debug, Serialize)]
struct FindInstrumentRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetCandlesRequest<'a> {
    instrument_id: &'a str,
    from: String,
    to: String,
    interval: &'static str,
}

/// Request-scoped Invest API client. Built fresh for each inbound request
/// and dropped on every exit path; no pooling across requests.
pub struct TinkoffClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl TinkoffClient {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: config.api_base.clone(),
            token: config.token.clone(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Resolve a display ticker to an instrument. `None` when nothing
    /// matches the query; the first hit wins otherwise.
    pub async fn find_instrument(&self, query: &str) -> Result<Option<Instrument>, FetchError> {
        let resp: InstrumentsResponse = self
            .post(FIND_INSTRUMENT, &FindInstrumentRequest { query })
            .await?;
        Ok(resp.instruments.into_iter().next())
    }

    /// Fetch candles for an instrument over `[from, to]` at the given interval.
    pub async fn get_candles(
        &self,
        instrument_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>, FetchError> {
        let req = GetCandlesRequest {
            instrument_id,
            from: from.to_rfc3339_opts(SecondsFormat::Secs, true),
            to: to.to_rfc3339_opts(SecondsFormat::Secs, true),
            interval: interval.as_str(),
        };
        let resp: CandlesResponse = self.post(GET_CANDLES, &req).await?;
        Ok(resp
            .candles
            .into_iter()
            .map(|c| Candle {
                time: c.time,
                open: c.open.to_f64(),
                high: c.high.to_f64(),
                low: c.low.to_f64(),
                close: c.close.to_f64(),
                volume: c.volume,
            })
            .collect())
    }

    /// Resolve `ticker` and fetch its candles, collapsing every upstream
    /// fault to an empty sequence. "No data" and "upstream down" are
    /// indistinguishable here; the analysis layer reports both as
    /// insufficient data.
    pub async fn fetch_candles(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: CandleInterval,
    ) -> Vec<Candle> {
        match self.try_fetch(ticker, from, to, interval).await {
            Ok(candles) => candles,
            Err(e) => {
                tracing::error!("candle fetch for {ticker} failed: {e}");
                Vec::new()
            }
        }
    }

    async fn try_fetch(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>, FetchError> {
        let Some(instrument) = self.find_instrument(ticker).await? else {
            tracing::warn!("instrument {ticker} not found");
            return Ok(Vec::new());
        };
        let candles = self
            .get_candles(&instrument.uid, from, to, interval)
            .await?;
        tracing::info!(
            "fetched {} candles for {ticker} ({from} .. {to})",
            candles.len()
        );
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotation_converts_units_and_nanos() {
        let q: Quotation = serde_json::from_str(r#"{"units":"123","nano":500000000}"#).unwrap();
        assert_eq!(q.to_f64(), 123.5);
    }

    #[test]
    fn quotation_accepts_numeric_units() {
        let q: Quotation = serde_json::from_str(r#"{"units":-2,"nano":-250000000}"#).unwrap();
        assert_eq!(q.to_f64(), -2.25);
    }

    #[test]
    fn candles_response_decodes_protobuf_json() {
        let raw = r#"{
            "candles": [{
                "open": {"units": "100", "nano": 0},
                "high": {"units": "101", "nano": 500000000},
                "low": {"units": "99", "nano": 0},
                "close": {"units": "100", "nano": 750000000},
                "volume": "4200",
                "time": "2024-05-01T10:00:00Z",
                "isComplete": true
            }]
        }"#;
        let resp: CandlesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.candles.len(), 1);
        let c = &resp.candles[0];
        assert_eq!(c.volume, 4200);
        assert_eq!(c.close.to_f64(), 100.75);
    }

    #[test]
    fn missing_candles_field_decodes_to_empty() {
        let resp: CandlesResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candles.is_empty());
    }

    #[test]
    fn hour_interval_wire_name() {
        assert_eq!(CandleInterval::Hour.as_str(), "CANDLE_INTERVAL_HOUR");
    }
}
