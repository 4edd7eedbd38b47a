//! ClassConnect - authentication and session-security service
//!
//! Password-based login with account lockout, rotating refresh-token
//! sessions with reuse detection, and a defensive middleware pipeline.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod security;
pub mod web;

pub use auth::{
    hash_password, hash_token, normalize_email, validate_password, verify_password, verify_token,
    AuthError, Credentials, LockoutPolicy, LockoutStatus, PasswordError, RegisterCommand,
    SessionManager, TokenError, TokenIssuer, TokenPair,
};
pub use config::Config;
pub use db::{Account, AccountPatch, AccountRepository, Database, NewAccount, SharedDatabase};
pub use error::{ClassConnectError, Result};
pub use rate_limit::{
    CounterStore, LocalCounterStore, RateLimitResult, RateLimiter, RouteBudget, RouteClass,
};
pub use security::{MaintenanceScheduler, SecurityEventSink};
