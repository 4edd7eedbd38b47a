//! Middleware for the Web API: the request defense pipeline plus bearer
//! authentication for downstream routes.

mod auth;
mod cors;
mod rate_limit;
mod sanitize;
mod security;
mod security_log;

pub use auth::{with_token_issuer, AuthUser};
pub use cors::create_cors_layer;
pub use rate_limit::{client_ip, rate_limit, ClientIp};
pub use sanitize::{escape_html, sanitize_query, sanitize_request, sanitize_value};
pub use security::security_headers;
pub use security_log::{match_suspicious, security_log};

/// Upper bound for bodies buffered by the defense middleware.
pub(crate) const MAX_BUFFERED_BODY_BYTES: usize = 1024 * 1024;
