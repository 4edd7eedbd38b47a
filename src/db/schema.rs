//! Database schema and migrations for ClassConnect.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Initial schema - accounts table
    r#"
-- Accounts table: identity, credential, lockout and session state
CREATE TABLE accounts (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    name                 TEXT NOT NULL,
    email                TEXT NOT NULL UNIQUE,   -- normalized: trimmed, lowercase
    password             TEXT NOT NULL,          -- Argon2 hash
    failed_attempts      INTEGER NOT NULL DEFAULT 0,
    locked_until         TEXT,                   -- NULL when not locked
    refresh_token_hashes TEXT NOT NULL DEFAULT '[]',  -- JSON array, oldest first
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE INDEX idx_accounts_email ON accounts(email);
"#,
];
