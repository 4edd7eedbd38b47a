//! Account repository: the credential store for the auth subsystem.
//!
//! Accounts are read as immutable snapshots and mutated by applying an
//! [`AccountPatch`] in a single UPDATE, so related fields (failed-attempt
//! counter, lockout deadline, session hash list) always move together.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{ClassConnectError, Result};

/// Account snapshot.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    /// Account ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Normalized email (trimmed, lowercase). Unique at the store level.
    pub email: String,
    /// Password hash (Argon2 PHC string).
    pub password: String,
    /// Consecutive failed login attempts.
    pub failed_attempts: i64,
    /// Lockout deadline. None when the account is not locked.
    pub locked_until: Option<DateTime<Utc>>,
    /// Active refresh-token hashes, oldest first. Bounded by the session cap.
    #[sqlx(json)]
    pub refresh_token_hashes: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// New account for creation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Normalized email.
    pub email: String,
    /// Password hash.
    pub password: String,
}

/// Partial update command applied atomically to one account row.
///
/// `None` leaves a field untouched. For `locked_until`, `Some(None)` clears
/// the lock and `Some(Some(t))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    /// New failed-attempt count.
    pub failed_attempts: Option<i64>,
    /// New lockout deadline (outer None = leave, inner None = clear).
    pub locked_until: Option<Option<DateTime<Utc>>>,
    /// Replacement refresh-token hash list.
    pub refresh_token_hashes: Option<Vec<String>>,
}

/// Check whether a store error is a unique-constraint violation.
pub fn is_unique_violation(err: &ClassConnectError) -> bool {
    matches!(err, ClassConnectError::Database(msg) if msg.contains("UNIQUE"))
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new account.
    ///
    /// Returns the created account with the assigned ID. Fails with a
    /// database error containing "UNIQUE" if the email is already taken.
    pub async fn create(&self, new_account: &NewAccount) -> Result<Account> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO accounts (name, email, password, refresh_token_hashes, created_at, updated_at)
             VALUES (?, ?, ?, '[]', ?, ?)",
        )
        .bind(&new_account.name)
        .bind(&new_account.email)
        .bind(&new_account.password)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| ClassConnectError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ClassConnectError::NotFound("account".to_string()))
    }

    /// Get an account by ID.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, name, email, password, failed_attempts, locked_until,
                    refresh_token_hashes, created_at, updated_at
             FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ClassConnectError::Database(e.to_string()))?;

        Ok(account)
    }

    /// Get an account by normalized email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, name, email, password, failed_attempts, locked_until,
                    refresh_token_hashes, created_at, updated_at
             FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ClassConnectError::Database(e.to_string()))?;

        Ok(account)
    }

    /// Apply a patch to one account in a single UPDATE.
    ///
    /// `updated_at` always advances, so session activity keeps the account
    /// out of the stale-session purge.
    pub async fn apply(&self, id: i64, patch: &AccountPatch) -> Result<()> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE accounts SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(attempts) = patch.failed_attempts {
            query.push(", failed_attempts = ");
            query.push_bind(attempts);
        }
        if let Some(locked_until) = patch.locked_until {
            query.push(", locked_until = ");
            query.push_bind(locked_until);
        }
        if let Some(hashes) = &patch.refresh_token_hashes {
            let json = serde_json::to_string(hashes)
                .map_err(|e| ClassConnectError::Database(e.to_string()))?;
            query.push(", refresh_token_hashes = ");
            query.push_bind(json);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| ClassConnectError::Database(e.to_string()))?;

        Ok(())
    }

    /// Clear refresh-token hashes for accounts with no activity since the
    /// cutoff. Returns the number of accounts purged.
    pub async fn purge_stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token_hashes = '[]'
             WHERE updated_at < ? AND refresh_token_hashes != '[]'",
        )
        .bind(cutoff)
        .execute(self.pool)
        .await
        .map_err(|e| ClassConnectError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
