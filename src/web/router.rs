//! Router configuration for the Web API.
//!
//! Request path through the defense pipeline, outermost first:
//! trace -> CORS -> security headers -> issuer injection -> general rate
//! limit -> suspicious-input logging -> sanitization -> auth-class rate
//! limit -> handlers. Rate limits always fire before business logic;
//! security logging sees the raw payload before sanitization rewrites it.

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::rate_limit::{RateLimiter, RouteClass};
use crate::security::SecurityEventSink;

use super::handlers::{login, logout, me, refresh, register, AppState};
use super::middleware::{
    create_cors_layer, rate_limit, sanitize_request, security_headers, security_log,
    with_token_issuer,
};

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    limiter: Arc<RateLimiter>,
    sink: Arc<SecurityEventSink>,
    cors_origins: &[String],
) -> Router {
    let issuer = app_state.issuer.clone();

    // Auth routes carry their own (stricter) budget
    let auth_limiter = limiter.clone();
    let auth_sink = sink.clone();
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = auth_limiter.clone();
            let sink = auth_sink.clone();
            async move { rate_limit(RouteClass::Auth, limiter, sink, req, next).await }
        }));

    let general_limiter = limiter.clone();
    let general_sink = sink.clone();
    let log_sink = sink.clone();
    let api_routes = Router::new().nest("/auth", auth_routes).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(move |req, next| {
                let limiter = general_limiter.clone();
                let sink = general_sink.clone();
                async move { rate_limit(RouteClass::General, limiter, sink, req, next).await }
            }))
            .layer(middleware::from_fn(move |req, next| {
                let sink = log_sink.clone();
                async move { security_log(sink, req, next).await }
            }))
            .layer(middleware::from_fn(sanitize_request)),
    );

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let issuer = issuer.clone();
                    async move { with_token_issuer(issuer, req, next).await }
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
