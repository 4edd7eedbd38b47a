//! Rate limiting middleware.
//!
//! Applies the fixed-window, per-route-class budgets from
//! [`crate::rate_limit`] before any business logic runs. Denials respond
//! 429 and emit a security event.

use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::rate_limit::{RateLimitResult, RateLimiter, RouteClass};
use crate::security::SecurityEventSink;
use crate::web::error::ApiError;

/// Resolve the client address for a request.
///
/// Prefers proxy headers, then falls back to the socket address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    // Try X-Forwarded-For header first (for reverse proxy)
    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|v| v.to_str().ok()) {
        // Take the first IP in the chain
        if let Some(ip) = forwarded.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    // Try X-Real-IP header
    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    // Fall back to connection info
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Extractor handing the client address to handlers for audit logging.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions)))
    }
}

/// Rate limiting middleware for one route class.
pub async fn rate_limit(
    class: RouteClass,
    limiter: Arc<RateLimiter>,
    sink: Arc<SecurityEventSink>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers(), req.extensions());

    match limiter.check(class, &ip) {
        RateLimitResult::Allowed => next.run(req).await,
        RateLimitResult::Denied { retry_after } => {
            sink.rate_limited(class.as_str(), &ip);
            tracing::warn!(
                ip = %ip,
                route_class = class.as_str(),
                retry_after_secs = retry_after.as_secs(),
                "rate limit exceeded"
            );
            ApiError::too_many_requests("Too many requests. Please try again later")
                .into_response()
        }
    }
}
