//! Authentication handlers.
//!
//! Handlers are thin: they translate between the HTTP surface (DTOs,
//! cookies, status codes) and the [`SessionManager`]. The refresh token
//! travels only in an HTTP-only cookie scoped to the refresh endpoint.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::auth::{
    Credentials, LockoutPolicy, RegisterCommand, SessionManager, TokenIssuer,
};
use crate::config::AuthConfig;
use crate::db::{AccountRepository, SharedDatabase};
use crate::security::SecurityEventSink;
use crate::web::dto::{
    AccessTokenResponse, ApiResponse, LoginRequest, LogoutResponse, MeResponse, RegisterRequest,
    RegisterResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, ClientIp};

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE_NAME: &str = "jid";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth/refresh";

/// Application state shared across handlers.
pub struct AppState {
    /// Database handle.
    pub db: SharedDatabase,
    /// Session manager.
    pub sessions: SessionManager,
    /// Token issuer, shared with the bearer-token extractor.
    pub issuer: Arc<TokenIssuer>,
    /// Access token expiry in seconds (reported to clients).
    pub access_token_expiry_secs: u64,
    /// Whether the refresh cookie carries the Secure flag.
    pub cookie_secure: bool,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(
        db: SharedDatabase,
        auth: &AuthConfig,
        production: bool,
        events: Arc<SecurityEventSink>,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(
            &auth.access_token_secret,
            &auth.refresh_token_secret,
            auth.access_token_expiry_secs,
            auth.refresh_token_expiry_days,
        ));

        let sessions = SessionManager::new(
            db.clone(),
            issuer.clone(),
            LockoutPolicy::new(auth.max_login_attempts, auth.lockout_duration_secs),
            auth.max_sessions_per_account,
            events,
        );

        Self {
            db,
            sessions,
            issuer,
            access_token_expiry_secs: auth.access_token_expiry_secs,
            cookie_secure: production,
        }
    }

    /// Build the refresh cookie for a freshly issued token.
    fn refresh_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE_NAME, token))
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .path(REFRESH_COOKIE_PATH)
            .build()
    }

    /// Build the removal cookie used to clear the refresh cookie.
    fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::from(REFRESH_COOKIE_NAME);
        cookie.set_path(REFRESH_COOKIE_PATH);
        cookie
    }
}

fn access_response(state: &AppState, access_token: String) -> Json<ApiResponse<AccessTokenResponse>> {
    Json(ApiResponse::new(AccessTokenResponse {
        access_token,
        expires_in: state.access_token_expiry_secs,
    }))
}

/// POST /api/auth/register - Account registration.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    let account_id = state
        .sessions
        .register(
            RegisterCommand {
                name: req.name,
                email: req.email,
                password: req.password,
            },
            &ip,
        )
        .await?;

    Ok(Json(ApiResponse::new(RegisterResponse { account_id })))
}

/// POST /api/auth/login - Account login.
///
/// Returns the access token in the body and sets the refresh cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<AccessTokenResponse>>), ApiError> {
    let pair = state
        .sessions
        .login(
            Credentials {
                email: req.email,
                password: req.password,
            },
            &ip,
        )
        .await?;

    let jar = jar.add(state.refresh_cookie(pair.refresh_token));
    Ok((jar, access_response(&state, pair.access_token)))
}

/// POST /api/auth/refresh - Rotate the refresh token, mint a new access token.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<AccessTokenResponse>>), ApiError> {
    let token = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let pair = state.sessions.refresh(&token, &ip).await?;

    let jar = jar.add(state.refresh_cookie(pair.refresh_token));
    Ok((jar, access_response(&state, pair.access_token)))
}

/// POST /api/auth/logout - Close the current session.
///
/// Always succeeds and always clears the cookie, whatever the server-side
/// outcome was.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<LogoutResponse>>) {
    let token = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());

    state.sessions.logout(token.as_deref(), &ip).await;

    let jar = jar.remove(state.removal_cookie());
    (jar, Json(ApiResponse::new(LogoutResponse { success: true })))
}

/// GET /api/auth/me - Current account info.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(account_id): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let repo = AccountRepository::new(state.db.pool());
    let account = repo
        .find_by_id(account_id)
        .await
        .map_err(|e| {
            tracing::error!("account lookup failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(ApiResponse::new(MeResponse {
        id: account.id,
        name: account.name,
        email: account.email,
        created_at: account.created_at,
    })))
}
