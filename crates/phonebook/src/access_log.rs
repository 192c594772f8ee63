//! Per-request access log
//!
//! One line per request on the `phonebook::access` target:
//! `METHOD URL STATUS CONTENT-LENGTH - TIME ms POST-DATA`

use std::time::Instant;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::{is_json, ApiError, ApiState};

pub async fn access_log(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let url = req.uri().to_string();

    // POST bodies are buffered so the submitted fields can be logged
    let (req, post_data) = if method == Method::POST {
        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => {
                // Non-JSON bodies reach the handler as an empty payload
                let post_data = if is_json(&parts.headers) {
                    post_data(&bytes)
                } else {
                    "{}".to_string()
                };
                (Request::from_parts(parts, Body::from(bytes)), post_data)
            }
            Err(e) => {
                debug!("Failed to read request body: {}", e);
                let response = if exceeds_limit(&e) {
                    ApiError::payload_too_large()
                } else {
                    ApiError::unreadable_body()
                }
                .into_response();
                record(&state, &method, &url, &response, start, "-");
                return response;
            }
        }
    } else {
        (req, "-".to_string())
    };

    let response = next.run(req).await;
    record(&state, &method, &url, &response, start, &post_data);
    response
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn record(state: &ApiState, method: &Method, url: &str, response: &Response, start: Instant, post_data: &str) {
    let elapsed = start.elapsed();
    let status = response.status();

    state.metrics.request_latency.observe(elapsed.as_secs_f64());
    if status.is_client_error() || status.is_server_error() {
        state.metrics.requests_rejected.inc();
    }

    info!(
        target: "phonebook::access",
        "{} {} {} {} - {:.3} ms {}",
        method,
        url,
        status.as_u16(),
        content_length(response),
        elapsed.as_secs_f64() * 1000.0,
        post_data,
    );
}

fn content_length(response: &Response) -> String {
    if let Some(len) = response.body().size_hint().exact() {
        return len.to_string();
    }

    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| "-".to_string())
}

/// `{"name":..,"number":..}` with only the fields the client actually sent
pub fn post_data(body: &Bytes) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let mut fields = Map::new();

    if let Some(Value::Object(obj)) = parsed {
        for key in ["name", "number"] {
            if let Some(value) = obj.get(key) {
                fields.insert(key.to_string(), value.clone());
            }
        }
    }

    Value::Object(fields).to_string()
}
