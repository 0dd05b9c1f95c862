use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for hub API responses.
///
/// Upstream market-data faults never appear here: the analysis layer
/// converts them to sentinel strings inside a 200 body. Only genuine
/// client errors (and internal plumbing failures) become HTTP errors.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self::BadRequest(msg) = self;
        let body = json!({ "error": msg });
        (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
    }
}
