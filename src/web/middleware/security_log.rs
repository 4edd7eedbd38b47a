//! Suspicious-input logging middleware.
//!
//! Scans raw request content against a small signature list and emits a
//! security event on a match. Runs before sanitization so the event records
//! what the client actually sent; it never blocks or mutates the request.

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::security::SecurityEventSink;
use crate::web::error::ApiError;
use crate::web::middleware::{client_ip, MAX_BUFFERED_BODY_BYTES};

/// Signatures checked against lowercased body + query content.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "onerror=",
    "../",
    "..\\",
    "union select",
    "$where",
    "$ne",
];

/// Find the first suspicious signature in the given content.
pub fn match_suspicious(content: &str) -> Option<&'static str> {
    let lowered = content.to_lowercase();
    SUSPICIOUS_PATTERNS
        .iter()
        .find(|pattern| lowered.contains(&pattern.to_lowercase()))
        .copied()
}

/// Security logging middleware.
pub async fn security_log(
    sink: Arc<SecurityEventSink>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers(), req.extensions());
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::bad_request("Request body too large").into_response();
        }
    };

    let content = format!("{} {}", String::from_utf8_lossy(&bytes), query);
    if let Some(pattern) = match_suspicious(&content) {
        sink.suspicious_input(pattern, &path, &ip);
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
