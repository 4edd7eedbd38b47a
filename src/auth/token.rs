//! Access and refresh token issuing for ClassConnect.
//!
//! Both token kinds are signed JWTs carrying the account id as subject.
//! Access and refresh tokens use separate signing secrets, so a leaked
//! access token can never be used to mint refresh tokens and vice versa.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token-related errors.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Token is malformed, expired, or carries a bad signature.
    #[error("invalid or expired token")]
    Invalid,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID).
    pub sub: i64,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID, unique per token so same-second issues never collide.
    pub jti: String,
}

/// Issues and verifies access and refresh tokens.
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenIssuer {
    /// Create a new token issuer.
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_secs: u64,
        refresh_ttl_days: u64,
    ) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs as i64),
            refresh_ttl: Duration::days(refresh_ttl_days as i64),
            validation,
        }
    }

    /// Access token TTL in seconds.
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl.num_seconds() as u64
    }

    fn sign(
        &self,
        key: &EncodingKey,
        account_id: i64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: account_id,
            iat: now.timestamp() as u64,
            exp: (now + ttl).timestamp() as u64,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, key).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue an access token for an account.
    pub fn issue_access(&self, account_id: i64) -> Result<String, TokenError> {
        self.issue_access_at(account_id, Utc::now())
    }

    /// Issue an access token with an explicit issue time (for clock injection).
    pub fn issue_access_at(
        &self,
        account_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&self.access_encoding, account_id, now, self.access_ttl)
    }

    /// Issue a refresh token for an account.
    pub fn issue_refresh(&self, account_id: i64) -> Result<String, TokenError> {
        self.issue_refresh_at(account_id, Utc::now())
    }

    /// Issue a refresh token with an explicit issue time (for clock injection).
    pub fn issue_refresh_at(
        &self,
        account_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&self.refresh_encoding, account_id, now, self.refresh_ttl)
    }

    fn verify(&self, key: &DecodingKey, token: &str) -> Result<i64, TokenError> {
        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            tracing::debug!("token validation failed: {}", e);
            TokenError::Invalid
        })?;
        Ok(data.claims.sub)
    }

    /// Verify an access token and return the account id it was issued for.
    pub fn verify_access(&self, token: &str) -> Result<i64, TokenError> {
        self.verify(&self.access_decoding, token)
    }

    /// Verify a refresh token and return the account id it was issued for.
    pub fn verify_refresh(&self, token: &str) -> Result<i64, TokenError> {
        self.verify(&self.refresh_decoding, token)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_issuer() -> TokenIssuer {
        TokenIssuer::new("access-test-secret", "refresh-test-secret", 900, 30)
    }

    #[test]
    fn test_access_token_roundtrip() {
        let issuer = create_issuer();

        for id in [1, 42, i64::MAX] {
            let token = issuer.issue_access(id).unwrap();
            assert_eq!(issuer.verify_access(&token).unwrap(), id);
        }
    }

    #[test]
    fn test_refresh_token_roundtrip() {
        let issuer = create_issuer();

        let token = issuer.issue_refresh(7).unwrap();
        assert_eq!(issuer.verify_refresh(&token).unwrap(), 7);
    }

    #[test]
    fn test_secret_separation() {
        let issuer = create_issuer();

        // An access token must not verify as a refresh token
        let access = issuer.issue_access(1).unwrap();
        assert!(issuer.verify_refresh(&access).is_err());

        // A refresh token must not verify as an access token
        let refresh = issuer.issue_refresh(1).unwrap();
        assert!(issuer.verify_access(&refresh).is_err());
    }

    #[test]
    fn test_expired_access_token_rejected() {
        let issuer = create_issuer();

        // Issued 16 minutes ago with a 15 minute TTL
        let past = Utc::now() - Duration::seconds(960);
        let token = issuer.issue_access_at(1, past).unwrap();

        assert!(matches!(
            issuer.verify_access(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_access_token_valid_within_window() {
        let issuer = create_issuer();

        // Issued 14 minutes ago with a 15 minute TTL
        let recent = Utc::now() - Duration::seconds(840);
        let token = issuer.issue_access_at(1, recent).unwrap();

        assert_eq!(issuer.verify_access(&token).unwrap(), 1);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = create_issuer();
        let other = TokenIssuer::new("other-access", "other-refresh", 900, 30);

        let token = issuer.issue_access(1).unwrap();
        assert!(other.verify_access(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = create_issuer();
        assert!(issuer.verify_access("not.a.token").is_err());
        assert!(issuer.verify_refresh("").is_err());
    }

    #[test]
    fn test_tokens_are_unique() {
        let issuer = create_issuer();

        // Same account, same second: jti must keep the tokens distinct
        let now = Utc::now();
        let t1 = issuer.issue_refresh_at(1, now).unwrap();
        let t2 = issuer.issue_refresh_at(1, now).unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_access_ttl_secs() {
        let issuer = create_issuer();
        assert_eq!(issuer.access_ttl_secs(), 900);
    }
}
