//! Configuration module for ClassConnect.

use serde::Deserialize;
use std::path::Path;

use crate::{ClassConnectError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins. Empty means permissive dev mode.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Production mode. Controls the Secure flag on the refresh cookie.
    #[serde(default)]
    pub production: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            production: false,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/classconnect.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication and session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens.
    #[serde(default = "default_access_secret")]
    pub access_token_secret: String,
    /// Secret used to sign refresh tokens. Must differ from the access secret.
    #[serde(default = "default_refresh_secret")]
    pub refresh_token_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_days: u64,
    /// Maximum concurrent sessions per account. Oldest is evicted beyond this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_account: usize,
    /// Failed login attempts before the account is locked.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    /// Lockout duration in seconds.
    #[serde(default = "default_lockout_duration")]
    pub lockout_duration_secs: u64,
}

fn default_access_secret() -> String {
    "access_secret".to_string()
}

fn default_refresh_secret() -> String {
    "refresh_secret".to_string()
}

fn default_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_refresh_expiry() -> u64 {
    30
}

fn default_max_sessions() -> usize {
    5
}

fn default_max_login_attempts() -> u32 {
    5
}

fn default_lockout_duration() -> u64 {
    2 * 60 * 60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: default_access_secret(),
            refresh_token_secret: default_refresh_secret(),
            access_token_expiry_secs: default_access_expiry(),
            refresh_token_expiry_days: default_refresh_expiry(),
            max_sessions_per_account: default_max_sessions(),
            max_login_attempts: default_max_login_attempts(),
            lockout_duration_secs: default_lockout_duration(),
        }
    }
}

/// Per-route-class rate limit budgets (fixed windows, keyed by client IP).
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Authentication routes: max requests per window.
    #[serde(default = "default_auth_max")]
    pub auth_max: u32,
    /// Authentication routes: window in seconds.
    #[serde(default = "default_quarter_hour")]
    pub auth_window_secs: u64,
    /// Post creation: max requests per window.
    #[serde(default = "default_post_create_max")]
    pub post_create_max: u32,
    /// Post creation: window in seconds.
    #[serde(default = "default_hour")]
    pub post_create_window_secs: u64,
    /// Comments: max requests per window.
    #[serde(default = "default_comment_max")]
    pub comment_max: u32,
    /// Comments: window in seconds.
    #[serde(default = "default_quarter_hour")]
    pub comment_window_secs: u64,
    /// Likes: max requests per window.
    #[serde(default = "default_like_max")]
    pub like_max: u32,
    /// Likes: window in seconds.
    #[serde(default = "default_quarter_hour")]
    pub like_window_secs: u64,
    /// General API: max requests per window.
    #[serde(default = "default_general_max")]
    pub general_max: u32,
    /// General API: window in seconds.
    #[serde(default = "default_quarter_hour")]
    pub general_window_secs: u64,
}

fn default_auth_max() -> u32 {
    100
}

fn default_post_create_max() -> u32 {
    10
}

fn default_comment_max() -> u32 {
    30
}

fn default_like_max() -> u32 {
    100
}

fn default_general_max() -> u32 {
    300
}

fn default_quarter_hour() -> u64 {
    15 * 60
}

fn default_hour() -> u64 {
    60 * 60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_max: default_auth_max(),
            auth_window_secs: default_quarter_hour(),
            post_create_max: default_post_create_max(),
            post_create_window_secs: default_hour(),
            comment_max: default_comment_max(),
            comment_window_secs: default_quarter_hour(),
            like_max: default_like_max(),
            like_window_secs: default_quarter_hour(),
            general_max: default_general_max(),
            general_window_secs: default_quarter_hour(),
        }
    }
}

/// Background maintenance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Interval between cleanup runs in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Accounts inactive for this many days get their sessions purged.
    #[serde(default = "default_stale_session_days")]
    pub stale_session_days: i64,
}

fn default_cleanup_interval() -> u64 {
    24 * 60 * 60
}

fn default_stale_session_days() -> i64 {
    30
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
            stale_session_days: default_stale_session_days(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the application log file.
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Path to the security event log file (JSON lines).
    #[serde(default = "default_security_log_file")]
    pub security_file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/classconnect.log".to_string()
}

fn default_security_log_file() -> String {
    "logs/security.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            security_file: default_security_log_file(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Rate limit budgets.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Maintenance settings.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| ClassConnectError::Config(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Recognized variables: `CLASSCONNECT_ACCESS_SECRET`,
    /// `CLASSCONNECT_REFRESH_SECRET`, `CLASSCONNECT_PRODUCTION`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("CLASSCONNECT_ACCESS_SECRET") {
            if !secret.is_empty() {
                self.auth.access_token_secret = secret;
            }
        }
        if let Ok(secret) = std::env::var("CLASSCONNECT_REFRESH_SECRET") {
            if !secret.is_empty() {
                self.auth.refresh_token_secret = secret;
            }
        }
        if let Ok(mode) = std::env::var("CLASSCONNECT_PRODUCTION") {
            self.server.production = matches!(mode.as_str(), "1" | "true" | "yes");
        }
    }

    /// Validate the configuration for production deployments.
    ///
    /// Refuses to run in production with the built-in development secrets or
    /// with identical access/refresh secrets.
    pub fn validate(&self) -> Result<()> {
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(ClassConnectError::Config(
                "access and refresh token secrets must differ".to_string(),
            ));
        }
        if self.server.production
            && (self.auth.access_token_secret == default_access_secret()
                || self.auth.refresh_token_secret == default_refresh_secret())
        {
            return Err(ClassConnectError::Config(
                "default token secrets are not allowed in production".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.access_token_expiry_secs, 900);
        assert_eq!(config.auth.refresh_token_expiry_days, 30);
        assert_eq!(config.auth.max_sessions_per_account, 5);
        assert_eq!(config.auth.max_login_attempts, 5);
        assert_eq!(config.auth.lockout_duration_secs, 7200);
        assert_eq!(config.rate_limit.auth_max, 100);
        assert_eq!(config.rate_limit.post_create_max, 10);
        assert_eq!(config.rate_limit.general_max, 300);
        assert_eq!(config.maintenance.stale_session_days, 30);
        assert!(!config.server.production);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            [server]
            port = 8088
            production = true

            [auth]
            access_token_secret = "aaa"
            refresh_token_secret = "bbb"
            lockout_duration_secs = 60
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8088);
        assert!(config.server.production);
        assert_eq!(config.auth.access_token_secret, "aaa");
        assert_eq!(config.auth.lockout_duration_secs, 60);
        // Unspecified sections fall back to defaults
        assert_eq!(config.rate_limit.comment_max, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_identical_secrets() {
        let mut config = Config::default();
        config.auth.access_token_secret = "same".to_string();
        config.auth.refresh_token_secret = "same".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_default_secrets_in_production() {
        let mut config = Config::default();
        config.server.production = true;
        assert!(config.validate().is_err());

        config.auth.access_token_secret = "real-access-secret".to_string();
        config.auth.refresh_token_secret = "real-refresh-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_allows_dev_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
