//! Payload sanitization middleware.
//!
//! Neutralizes hostile request content before handlers parse it:
//! - HTML metacharacters in every JSON string are escaped, recursively.
//! - Object keys starting with `$` or containing `.` are dropped, so
//!   operator-shaped payloads never reach the store's query layer.
//! - Query-string values get the same escaping.

use axum::{
    body::Body,
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::web::error::ApiError;
use crate::web::middleware::MAX_BUFFERED_BODY_BYTES;

/// Escape HTML metacharacters in a string.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Check whether an object key is operator-shaped.
fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Recursively sanitize a JSON value in place.
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            let escaped = escape_html(s);
            if escaped != *s {
                *s = escaped;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_value(item);
            }
        }
        Value::Object(map) => {
            let banned: Vec<String> = map
                .keys()
                .filter(|key| is_operator_key(key))
                .cloned()
                .collect();
            for key in banned {
                map.remove(&key);
            }
            for nested in map.values_mut() {
                sanitize_value(nested);
            }
        }
        _ => {}
    }
}

/// Sanitize a raw query string, returning the rewritten form.
pub fn sanitize_query(query: &str) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        serializer.append_pair(&key, &escape_html(&value));
    }
    serializer.finish()
}

fn is_json(req: &Request<Body>) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Sanitization middleware: rewrites query and JSON body before handlers run.
pub async fn sanitize_request(req: Request<Body>, next: Next) -> Response {
    let json = is_json(&req);
    let (mut parts, body) = req.into_parts();

    // Rewrite query-string values
    if let Some(query) = parts.uri.query() {
        let sanitized = sanitize_query(query);
        if sanitized != query {
            let path_and_query = format!("{}?{}", parts.uri.path(), sanitized);
            let mut uri_parts = parts.uri.clone().into_parts();
            if let Ok(pq) = path_and_query.parse() {
                uri_parts.path_and_query = Some(pq);
                if let Ok(uri) = Uri::from_parts(uri_parts) {
                    parts.uri = uri;
                }
            }
        }
    }

    // Rewrite JSON body
    let body = if json {
        let bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return ApiError::bad_request("Request body too large").into_response();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(mut value) => {
                sanitize_value(&mut value);
                let sanitized =
                    serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
                if let Ok(len) = sanitized.len().to_string().parse() {
                    parts.headers.insert(CONTENT_LENGTH, len);
                }
                Body::from(sanitized)
            }
            // Malformed JSON passes through; the typed extractor rejects it
            Err(_) => Body::from(bytes),
        }
    } else {
        body
    };

    next.run(Request::from_parts(parts, body)).await
}
