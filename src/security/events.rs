//! Security event sink.
//!
//! Structured audit events for the authentication subsystem. Events are
//! emitted on the `security` tracing target, which the logging setup routes
//! to a dedicated JSON log file. Emission never blocks and never alters the
//! response; the sink is constructed at startup and passed to the session
//! manager and the defense middleware.

use chrono::{DateTime, Utc};

/// Tracing target routed to the security log.
pub const SECURITY_TARGET: &str = "security";

/// Sink for security audit events.
#[derive(Debug, Clone, Default)]
pub struct SecurityEventSink;

impl SecurityEventSink {
    /// Create a new sink.
    pub fn new() -> Self {
        Self
    }

    /// A new account was registered.
    pub fn registration(&self, account_id: i64, ip: &str) {
        tracing::info!(
            target: "security",
            event = "REGISTRATION",
            account_id,
            ip,
            "account registered"
        );
    }

    /// Registration was rejected because the email is already taken.
    /// Internally distinct from validation failures; externally generic.
    pub fn duplicate_registration(&self, email: &str, ip: &str) {
        tracing::warn!(
            target: "security",
            event = "DUPLICATE_REGISTRATION",
            email,
            ip,
            "registration attempt for existing email"
        );
    }

    /// Successful login.
    pub fn login_success(&self, account_id: i64, ip: &str) {
        tracing::info!(
            target: "security",
            event = "LOGIN_SUCCESS",
            account_id,
            ip,
            "login succeeded"
        );
    }

    /// Failed login attempt. `remaining` is None when the email is unknown.
    pub fn login_failure(&self, email: &str, ip: &str, remaining: Option<u32>) {
        tracing::warn!(
            target: "security",
            event = "LOGIN_FAILURE",
            email,
            ip,
            remaining_attempts = remaining,
            "login failed"
        );
    }

    /// An account crossed the failure threshold and is now locked.
    pub fn account_locked(&self, account_id: i64, ip: &str, until: DateTime<Utc>) {
        tracing::warn!(
            target: "security",
            event = "ACCOUNT_LOCKED",
            account_id,
            ip,
            locked_until = %until,
            "account locked after repeated failures"
        );
    }

    /// A login attempt was rejected because the account is locked.
    pub fn lockout_rejected(&self, account_id: i64, ip: &str, until: DateTime<Utc>) {
        tracing::warn!(
            target: "security",
            event = "LOCKOUT_REJECTED",
            account_id,
            ip,
            locked_until = %until,
            "login rejected while locked"
        );
    }

    /// A refresh token was presented that no longer matches any stored hash;
    /// all sessions for the account were revoked.
    pub fn token_reuse(&self, account_id: i64, ip: &str, revoked_sessions: usize) {
        tracing::warn!(
            target: "security",
            event = "TOKEN_REUSE",
            account_id,
            ip,
            revoked_sessions,
            "refresh token reuse detected; all sessions revoked"
        );
    }

    /// A refresh token was rotated.
    pub fn token_rotated(&self, account_id: i64, ip: &str) {
        tracing::info!(
            target: "security",
            event = "TOKEN_ROTATED",
            account_id,
            ip,
            "refresh token rotated"
        );
    }

    /// Logout removed a session.
    pub fn logout(&self, account_id: i64, ip: &str) {
        tracing::info!(
            target: "security",
            event = "LOGOUT",
            account_id,
            ip,
            "session logged out"
        );
    }

    /// Raw request content matched a suspicious signature.
    pub fn suspicious_input(&self, pattern: &str, path: &str, ip: &str) {
        tracing::warn!(
            target: "security",
            event = "SUSPICIOUS_INPUT",
            pattern,
            path,
            ip,
            "suspicious request content"
        );
    }

    /// A request exceeded its route-class rate budget.
    pub fn rate_limited(&self, route_class: &str, ip: &str) {
        tracing::warn!(
            target: "security",
            event = "RATE_LIMITED",
            route_class,
            ip,
            "rate limit exceeded"
        );
    }
}
