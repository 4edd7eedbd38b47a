//! Bearer-token authentication middleware.
//!
//! Downstream routes authenticate with the access token via the [`AuthUser`]
//! extractor. The token issuer is injected into request extensions by
//! [`with_token_issuer`] so the extractor can verify signatures.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::web::error::ApiError;

/// Extractor for authenticated requests.
///
/// Resolves to the account id carried by a valid bearer access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        let issuer = parts
            .extensions
            .get::<Arc<TokenIssuer>>()
            .ok_or_else(|| ApiError::internal("Token issuer not configured"))?;

        let account_id = issuer.verify_access(token).map_err(|e| {
            tracing::debug!("access token validation failed: {}", e);
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser(account_id))
    }
}

/// Middleware that injects the token issuer into request extensions.
pub async fn with_token_issuer(
    issuer: Arc<TokenIssuer>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(issuer);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    async fn whoami(AuthUser(account_id): AuthUser) -> String {
        account_id.to_string()
    }

    fn test_app(issuer: Arc<TokenIssuer>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(move |req, next| {
                let issuer = issuer.clone();
                async move { with_token_issuer(issuer, req, next).await }
            }))
    }

    fn request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_resolves_account() {
        let issuer = Arc::new(TokenIssuer::new("access-a", "refresh-b", 900, 30));
        let token = issuer.issue_access(42).unwrap();
        let app = test_app(issuer);

        let response = app.oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"42");
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let issuer = Arc::new(TokenIssuer::new("access-a", "refresh-b", 900, 30));
        let app = test_app(issuer);

        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let issuer = Arc::new(TokenIssuer::new("access-a", "refresh-b", 900, 30));
        let app = test_app(issuer);

        let response = app.oneshot(request(Some("garbage"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_bearer() {
        let issuer = Arc::new(TokenIssuer::new("access-a", "refresh-b", 900, 30));
        let refresh = issuer.issue_refresh(42).unwrap();
        let app = test_app(issuer);

        let response = app.oneshot(request(Some(&refresh))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
