//! Request DTOs for the Web API.
//!
//! These are the strict parse-and-validate boundary: request bodies either
//! deserialize into one of these shapes or the request is rejected before
//! any business logic runs. Password policy is enforced by the session
//! manager, not here.

use serde::Deserialize;
use validator::Validate;

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name.
    #[validate(length(min = 1, max = 80, message = "Name must be 1-80 characters"))]
    pub name: String,
    /// Email address.
    #[validate(
        email(message = "Invalid email address"),
        length(max = 120, message = "Email must be at most 120 characters")
    )]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}
