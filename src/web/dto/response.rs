//! Response DTOs for the Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Registration response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// ID of the created account.
    pub account_id: i64,
}

/// Login / refresh response.
///
/// The refresh token is delivered only in the HTTP-only cookie, never here.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always true; logout is idempotent.
    pub success: bool,
}

/// Current account info.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Account ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_response_shape() {
        let response = ApiResponse::new(RegisterResponse { account_id: 7 });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"data": {"account_id": 7}}));
    }

    #[test]
    fn test_access_token_response_has_no_refresh_field() {
        let response = AccessTokenResponse {
            access_token: "abc".to_string(),
            expires_in: 900,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("refresh_token").is_none());
        assert_eq!(value["expires_in"], 900);
    }

    #[test]
    fn test_logout_response() {
        let value = serde_json::to_value(LogoutResponse { success: true }).unwrap();
        assert_eq!(value, json!({"success": true}));
    }
}
