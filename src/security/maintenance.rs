//! Background maintenance for session state.
//!
//! Periodically clears stored refresh-token hashes for accounts with no
//! activity inside the staleness window. Constructed at server startup;
//! the returned task handle ties its lifetime to the server.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::MaintenanceConfig;
use crate::db::{AccountRepository, SharedDatabase};
use crate::Result;

/// Scheduler for periodic session cleanup.
#[derive(Debug)]
pub struct MaintenanceScheduler {
    db: SharedDatabase,
    interval: Duration,
    stale_session_days: i64,
}

impl MaintenanceScheduler {
    /// Create a scheduler from configuration.
    pub fn new(db: SharedDatabase, config: &MaintenanceConfig) -> Self {
        Self {
            db,
            interval: Duration::from_secs(config.cleanup_interval_secs),
            stale_session_days: config.stale_session_days,
        }
    }

    /// Run one cleanup pass. Returns the number of accounts purged.
    pub async fn purge_stale_sessions(db: &SharedDatabase, stale_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(stale_days);
        let repo = AccountRepository::new(db.pool());
        repo.purge_stale_sessions(cutoff).await
    }

    /// Start the periodic cleanup task.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match Self::purge_stale_sessions(&self.db, self.stale_session_days).await {
                    Ok(count) => {
                        if count > 0 {
                            tracing::info!(
                                purged_accounts = count,
                                "Cleared sessions for inactive accounts"
                            );
                        } else {
                            tracing::debug!("No stale sessions to clean up");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Session cleanup failed");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountPatch, Database, NewAccount};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_purge_pass_clears_only_stale_accounts() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let repo = AccountRepository::new(db.pool());

        let stale = repo
            .create(&NewAccount {
                name: "Stale".to_string(),
                email: "stale@example.com".to_string(),
                password: "hash".to_string(),
            })
            .await
            .unwrap();
        repo.apply(
            stale.id,
            &AccountPatch {
                refresh_token_hashes: Some(vec!["old-hash".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE accounts SET updated_at = ? WHERE id = ?")
            .bind(Utc::now() - chrono::Duration::days(45))
            .bind(stale.id)
            .execute(db.pool())
            .await
            .unwrap();

        let purged = MaintenanceScheduler::purge_stale_sessions(&db, 30).await.unwrap();
        assert_eq!(purged, 1);

        let stale = repo.find_by_id(stale.id).await.unwrap().unwrap();
        assert!(stale.refresh_token_hashes.is_empty());
    }

    #[tokio::test]
    async fn test_start_returns_running_task() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let scheduler = MaintenanceScheduler::new(
            db,
            &MaintenanceConfig {
                cleanup_interval_secs: 3600,
                stale_session_days: 30,
            },
        );

        let handle = scheduler.start();
        assert!(!handle.is_finished());
        handle.abort();
    }
}
