use axum::body::Body;
use axum::http::Request;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceExt;

/// HTTP event delivered by the cloud-functions platform.
///
/// Every field is optional on the wire; an empty method defaults to GET and
/// an empty path to `/`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionEvent {
    pub http_method: String,
    pub path: String,
    pub query_string_parameters: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// Response shape the platform converts back into an HTTP reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Drive exactly one request/response cycle through the router.
pub async fn handle_event(app: Router, event: FunctionEvent) -> anyhow::Result<FunctionResponse> {
    let method = if event.http_method.is_empty() {
        "GET"
    } else {
        event.http_method.as_str()
    };
    let path = if event.path.is_empty() {
        "/"
    } else {
        event.path.as_str()
    };

    let uri = if event.query_string_parameters.is_empty() {
        path.to_string()
    } else {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(event.query_string_parameters.iter())
            .finish();
        format!("{path}?{qs}")
    };

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in &event.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let request = builder.body(Body::from(event.body.unwrap_or_default()))?;

    let response = app.oneshot(request).await?;

    let status = response.status();
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.to_string(), v.to_string());
        }
    }
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

    Ok(FunctionResponse {
        status_code: status.as_u16(),
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
