//! Session management for ClassConnect.
//!
//! The [`SessionManager`] orchestrates registration, login, refresh and
//! logout against the credential store, the token issuer and the lockout
//! guard. All session state lives in the store; requests hold no
//! cross-request locks, so concurrent refreshes race last-writer-wins on
//! the hash list and at worst surface as a spurious reuse detection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::auth::lockout::{LockoutPolicy, LockoutStatus};
use crate::auth::password::{
    hash_password, hash_token, validate_password, verify_password, verify_token, PasswordError,
};
use crate::auth::token::{TokenError, TokenIssuer};
use crate::db::{is_unique_violation, AccountRepository, NewAccount, SharedDatabase};
use crate::security::SecurityEventSink;
use crate::ClassConnectError;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 120;

/// Maximum display name length.
pub const MAX_NAME_LENGTH: usize = 80;

/// Authentication errors.
///
/// Kinds are distinguishable internally for logging; the HTTP layer decides
/// how much each one reveals externally.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Input failed shape or policy validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Email is already registered. Rendered externally as a generic
    /// failure to prevent account enumeration.
    #[error("account already registered")]
    DuplicateAccount,

    /// Unknown email or wrong password. `remaining` carries the attempts
    /// left before lockout when the account exists.
    #[error("invalid credentials")]
    InvalidCredentials {
        /// Attempts remaining before lockout, if known.
        remaining: Option<u32>,
    },

    /// Account is locked out.
    #[error("account locked until {until}")]
    AccountLocked {
        /// When the lock expires.
        until: DateTime<Utc>,
    },

    /// Token is malformed, expired or signed with the wrong secret.
    #[error("invalid or expired token")]
    InvalidToken,

    /// A rotated-out refresh token was presented; all sessions revoked.
    #[error("refresh token reused or revoked")]
    TokenReused,

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// Hashing backend unavailable.
    #[error("hashing failed: {0}")]
    Hash(String),

    /// Credential store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl From<ClassConnectError> for AuthError {
    fn from(e: ClassConnectError) -> Self {
        AuthError::Store(e.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Signing(msg) => AuthError::Signing(msg),
        }
    }
}

/// Typed registration command, produced at the parse boundary.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    /// Display name.
    pub name: String,
    /// Email address (normalized by the manager).
    pub email: String,
    /// Plaintext password (never stored or logged).
    pub password: String,
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Email address (normalized by the manager).
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Freshly issued token pair. The refresh token travels only in the cookie.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived, single-use refresh token.
    pub refresh_token: String,
}

/// Normalize an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Orchestrates login, refresh and logout against the credential store.
pub struct SessionManager {
    db: SharedDatabase,
    issuer: Arc<TokenIssuer>,
    lockout: LockoutPolicy,
    max_sessions: usize,
    events: Arc<SecurityEventSink>,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(
        db: SharedDatabase,
        issuer: Arc<TokenIssuer>,
        lockout: LockoutPolicy,
        max_sessions: usize,
        events: Arc<SecurityEventSink>,
    ) -> Self {
        Self {
            db,
            issuer,
            lockout,
            max_sessions,
            events,
        }
    }

    fn repo(&self) -> AccountRepository<'_> {
        AccountRepository::new(self.db.pool())
    }

    /// Register a new account. Returns the account id.
    pub async fn register(&self, cmd: RegisterCommand, ip: &str) -> Result<i64, AuthError> {
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AuthError::Validation(format!(
                "name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }

        let email = normalize_email(&cmd.email);
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".to_string()));
        }
        if email.len() > MAX_EMAIL_LENGTH {
            return Err(AuthError::Validation(format!(
                "email must be at most {MAX_EMAIL_LENGTH} characters"
            )));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("invalid email address".to_string()));
        }

        validate_password(&cmd.password).map_err(|e| AuthError::Validation(e.to_string()))?;

        // Pre-check keeps the common duplicate path off the expensive hash;
        // the UNIQUE constraint still catches the insert race.
        if self.repo().find_by_email(&email).await?.is_some() {
            self.events.duplicate_registration(&email, ip);
            return Err(AuthError::DuplicateAccount);
        }

        let password = hash_password(&cmd.password).map_err(|e| match e {
            PasswordError::HashError(msg) => AuthError::Hash(msg),
            other => AuthError::Validation(other.to_string()),
        })?;

        let account = match self
            .repo()
            .create(&NewAccount {
                name: name.to_string(),
                email: email.clone(),
                password,
            })
            .await
        {
            Ok(account) => account,
            Err(e) if is_unique_violation(&e) => {
                self.events.duplicate_registration(&email, ip);
                return Err(AuthError::DuplicateAccount);
            }
            Err(e) => return Err(e.into()),
        };

        self.events.registration(account.id, ip);
        Ok(account.id)
    }

    /// Authenticate and open a session.
    pub async fn login(&self, creds: Credentials, ip: &str) -> Result<TokenPair, AuthError> {
        let email = normalize_email(&creds.email);

        let account = match self.repo().find_by_email(&email).await? {
            Some(account) => account,
            None => {
                // Same external error as a wrong password
                self.events.login_failure(&email, ip, None);
                return Err(AuthError::InvalidCredentials { remaining: None });
            }
        };

        let now = Utc::now();

        // Lockout is checked before the password so a locked account costs
        // no hash computation and leaks no timing signal.
        if let LockoutStatus::Locked { until } = self.lockout.status(&account, now) {
            self.events.lockout_rejected(account.id, ip, until);
            return Err(AuthError::AccountLocked { until });
        }

        if !verify_password(&creds.password, &account.password) {
            let patch = self.lockout.on_failed_attempt(&account, now);
            let attempts = patch.failed_attempts.unwrap_or(account.failed_attempts);
            self.repo().apply(account.id, &patch).await?;

            if let Some(Some(until)) = patch.locked_until {
                self.events.account_locked(account.id, ip, until);
            }

            let remaining = self.lockout.max_attempts.saturating_sub(attempts.max(0) as u32);
            self.events.login_failure(&email, ip, Some(remaining));
            return Err(AuthError::InvalidCredentials {
                remaining: Some(remaining),
            });
        }

        let refresh_token = self.issuer.issue_refresh(account.id)?;
        let refresh_hash = hash_token(&refresh_token).map_err(|e| AuthError::Hash(e.to_string()))?;

        let mut hashes = account.refresh_token_hashes.clone();
        hashes.push(refresh_hash);
        // Oldest sessions are silently dropped beyond the cap
        while hashes.len() > self.max_sessions {
            hashes.remove(0);
        }

        let mut patch = self.lockout.on_successful_login();
        patch.refresh_token_hashes = Some(hashes);
        self.repo().apply(account.id, &patch).await?;

        let access_token = self.issuer.issue_access(account.id)?;
        self.events.login_success(account.id, ip);

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new token pair, rotating it.
    ///
    /// Presenting a token that no longer matches any stored hash is treated
    /// as theft or replay: every session for the account is revoked.
    pub async fn refresh(&self, refresh_token: &str, ip: &str) -> Result<TokenPair, AuthError> {
        let account_id = self
            .issuer
            .verify_refresh(refresh_token)
            .map_err(|_| AuthError::InvalidToken)?;

        let account = self
            .repo()
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let matched = account
            .refresh_token_hashes
            .iter()
            .position(|hash| verify_token(refresh_token, hash));

        let Some(index) = matched else {
            // Possible reuse: revoke everything
            let revoked = account.refresh_token_hashes.len();
            self.repo()
                .apply(
                    account.id,
                    &crate::db::AccountPatch {
                        refresh_token_hashes: Some(Vec::new()),
                        ..Default::default()
                    },
                )
                .await?;
            self.events.token_reuse(account.id, ip, revoked);
            return Err(AuthError::TokenReused);
        };

        let mut hashes = account.refresh_token_hashes.clone();
        hashes.remove(index);

        let new_refresh = self.issuer.issue_refresh(account.id)?;
        let new_hash = hash_token(&new_refresh).map_err(|e| AuthError::Hash(e.to_string()))?;
        hashes.push(new_hash);

        self.repo()
            .apply(
                account.id,
                &crate::db::AccountPatch {
                    refresh_token_hashes: Some(hashes),
                    ..Default::default()
                },
            )
            .await?;

        let access_token = self.issuer.issue_access(account.id)?;
        self.events.token_rotated(account.id, ip);

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh,
        })
    }

    /// Close the session for a refresh token.
    ///
    /// Best-effort and idempotent: a missing, invalid or already-removed
    /// token is not an error, and store failures are swallowed.
    pub async fn logout(&self, refresh_token: Option<&str>, ip: &str) {
        let Some(token) = refresh_token else {
            return;
        };

        let Ok(account_id) = self.issuer.verify_refresh(token) else {
            debug!("logout with unverifiable refresh token");
            return;
        };

        let account = match self.repo().find_by_id(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "logout account lookup failed");
                return;
            }
        };

        let Some(index) = account
            .refresh_token_hashes
            .iter()
            .position(|hash| verify_token(token, hash))
        else {
            return;
        };

        let mut hashes = account.refresh_token_hashes.clone();
        hashes.remove(index);

        if let Err(e) = self
            .repo()
            .apply(
                account.id,
                &crate::db::AccountPatch {
                    refresh_token_hashes: Some(hashes),
                    ..Default::default()
                },
            )
            .await
        {
            debug!(error = %e, "logout session removal failed");
            return;
        }

        self.events.logout(account.id, ip);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("lockout", &self.lockout)
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}
