//! Shared test harness for Web API integration tests.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use classconnect::rate_limit::RateLimiter;
use classconnect::security::SecurityEventSink;
use classconnect::web::handlers::AppState;
use classconnect::web::router::{create_health_router, create_router};
use classconnect::{Config, Database, SharedDatabase};

/// Create a test configuration with non-default secrets.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.access_token_secret = "test-access-secret-key".to_string();
    config.auth.refresh_token_secret = "test-refresh-secret-key".to_string();
    config
}

/// Create a test server with an in-memory database and the given config.
pub async fn create_test_server_with(config: Config) -> (TestServer, SharedDatabase) {
    let db: SharedDatabase = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );

    let sink = Arc::new(SecurityEventSink::new());
    let app_state = Arc::new(AppState::new(
        db.clone(),
        &config.auth,
        config.server.production,
        sink.clone(),
    ));
    let limiter = Arc::new(RateLimiter::local(&config.rate_limit));

    let router = create_router(app_state, limiter, sink, &config.server.cors_origins)
        .merge(create_health_router());

    let server = TestServer::new(router).expect("Failed to create test server");

    (server, db)
}

/// Create a test server with the default test configuration.
pub async fn create_test_server() -> (TestServer, SharedDatabase) {
    create_test_server_with(test_config()).await
}

/// Register an account and return the response body.
pub async fn register_user(
    server: &TestServer,
    name: &str,
    email: &str,
    password: &str,
) -> Value {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": name,
            "email": email,
            "password": password
        }))
        .await;

    response.json::<Value>()
}

/// Login and return the full response (body + cookies).
pub async fn login_user(
    server: &TestServer,
    email: &str,
    password: &str,
) -> axum_test::TestResponse {
    server
        .post("/api/auth/login")
        .json(&json!({
            "email": email,
            "password": password
        }))
        .await
}
