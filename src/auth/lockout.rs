//! Account lockout guard.
//!
//! Pure functions over an [`Account`] snapshot. Nothing here touches the
//! store; each transition returns an [`AccountPatch`] that the repository
//! applies in one UPDATE, so the failure counter and the lock deadline
//! always change together.
//!
//! Lock expiry is lazy: an expired lock reads as `Open` and is cleared by
//! whichever operation observes it next.

use chrono::{DateTime, Duration, Utc};

use crate::db::{Account, AccountPatch};

/// Default failed attempts before lockout.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (2 hours).
pub const DEFAULT_LOCKOUT_SECS: u64 = 2 * 60 * 60;

/// Lockout state of an account at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockoutStatus {
    /// Account accepts login attempts.
    Open {
        /// Current consecutive failure count.
        failed_attempts: u32,
    },
    /// Account rejects login attempts until the deadline.
    Locked {
        /// When the lock expires.
        until: DateTime<Utc>,
    },
}

/// Lockout policy: attempt budget and lock duration.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Failed attempts that trigger a lock.
    pub max_attempts: u32,
    /// How long a lock lasts.
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            duration: Duration::seconds(DEFAULT_LOCKOUT_SECS as i64),
        }
    }
}

impl LockoutPolicy {
    /// Create a policy from configuration values.
    pub fn new(max_attempts: u32, lockout_secs: u64) -> Self {
        Self {
            max_attempts,
            duration: Duration::seconds(lockout_secs as i64),
        }
    }

    /// Evaluate the lockout state at `now`.
    ///
    /// An expired lock reads as `Open`; the stale deadline is cleared by the
    /// next transition that observes it.
    pub fn status(&self, account: &Account, now: DateTime<Utc>) -> LockoutStatus {
        match account.locked_until {
            Some(until) if until > now => LockoutStatus::Locked { until },
            _ => LockoutStatus::Open {
                failed_attempts: account.failed_attempts.max(0) as u32,
            },
        }
    }

    /// Attempts left before the account locks, at `now`.
    pub fn remaining_attempts(&self, account: &Account, now: DateTime<Utc>) -> u32 {
        match self.status(account, now) {
            LockoutStatus::Locked { .. } => 0,
            LockoutStatus::Open { failed_attempts } => {
                self.max_attempts.saturating_sub(failed_attempts)
            }
        }
    }

    /// Transition for a failed login attempt.
    ///
    /// A failure after an expired lock starts a fresh count at 1 and clears
    /// the stale deadline. Otherwise the counter increments, and the attempt
    /// that reaches `max_attempts` sets the lock deadline.
    pub fn on_failed_attempt(&self, account: &Account, now: DateTime<Utc>) -> AccountPatch {
        if let Some(until) = account.locked_until {
            if until <= now {
                return AccountPatch {
                    failed_attempts: Some(1),
                    locked_until: Some(None),
                    ..Default::default()
                };
            }
        }

        let attempts = account.failed_attempts.max(0) + 1;
        let mut patch = AccountPatch {
            failed_attempts: Some(attempts),
            ..Default::default()
        };

        if attempts >= self.max_attempts as i64 && account.locked_until.is_none() {
            patch.locked_until = Some(Some(now + self.duration));
        }

        patch
    }

    /// Transition for a successful login: fresh counter, lock cleared.
    pub fn on_successful_login(&self) -> AccountPatch {
        AccountPatch {
            failed_attempts: Some(0),
            locked_until: Some(None),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with(failed_attempts: i64, locked_until: Option<DateTime<Utc>>) -> Account {
        let now = Utc::now();
        Account {
            id: 1,
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password: "hash".to_string(),
            failed_attempts,
            locked_until,
            refresh_token_hashes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_open_when_never_locked() {
        let policy = LockoutPolicy::default();
        let account = account_with(2, None);

        assert_eq!(
            policy.status(&account, Utc::now()),
            LockoutStatus::Open { failed_attempts: 2 }
        );
    }

    #[test]
    fn test_status_locked_within_window() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let until = now + Duration::hours(1);
        let account = account_with(5, Some(until));

        // Still locked 1ms before the deadline
        assert_eq!(
            policy.status(&account, until - Duration::milliseconds(1)),
            LockoutStatus::Locked { until }
        );
    }

    #[test]
    fn test_status_open_after_expiry() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let account = account_with(5, Some(now - Duration::seconds(1)));

        // Lazy expiry: the stale lock reads as open
        assert_eq!(
            policy.status(&account, now),
            LockoutStatus::Open { failed_attempts: 5 }
        );
    }

    #[test]
    fn test_fifth_failure_locks() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let account = account_with(4, None);

        let patch = policy.on_failed_attempt(&account, now);
        assert_eq!(patch.failed_attempts, Some(5));
        let until = patch.locked_until.expect("lock set").expect("deadline set");
        assert_eq!(until, now + Duration::seconds(DEFAULT_LOCKOUT_SECS as i64));
    }

    #[test]
    fn test_early_failures_do_not_lock() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        for prior in 0..3 {
            let account = account_with(prior, None);
            let patch = policy.on_failed_attempt(&account, now);
            assert_eq!(patch.failed_attempts, Some(prior + 1));
            assert_eq!(patch.locked_until, None);
        }
    }

    #[test]
    fn test_failure_after_expired_lock_restarts_count() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let account = account_with(5, Some(now - Duration::seconds(1)));

        let patch = policy.on_failed_attempt(&account, now);
        assert_eq!(patch.failed_attempts, Some(1));
        assert_eq!(patch.locked_until, Some(None));
    }

    #[test]
    fn test_failure_while_locked_does_not_extend_lock() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let until = now + Duration::hours(1);
        let account = account_with(5, Some(until));

        // The guard rejects these upstream, but the transition must not
        // stack a second deadline if it is ever reached.
        let patch = policy.on_failed_attempt(&account, now);
        assert_eq!(patch.failed_attempts, Some(6));
        assert_eq!(patch.locked_until, None);
    }

    #[test]
    fn test_success_resets_counter_and_lock() {
        let policy = LockoutPolicy::default();
        let patch = policy.on_successful_login();
        assert_eq!(patch.failed_attempts, Some(0));
        assert_eq!(patch.locked_until, Some(None));
        assert_eq!(patch.refresh_token_hashes, None);
    }

    #[test]
    fn test_remaining_attempts() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        assert_eq!(policy.remaining_attempts(&account_with(0, None), now), 5);
        assert_eq!(policy.remaining_attempts(&account_with(3, None), now), 2);
        assert_eq!(
            policy.remaining_attempts(&account_with(5, Some(now + Duration::hours(1))), now),
            0
        );
    }

    #[test]
    fn test_custom_policy() {
        let policy = LockoutPolicy::new(3, 60);
        let now = Utc::now();
        let account = account_with(2, None);

        let patch = policy.on_failed_attempt(&account, now);
        assert_eq!(patch.failed_attempts, Some(3));
        let until = patch.locked_until.expect("lock set").expect("deadline set");
        assert_eq!(until, now + Duration::seconds(60));
    }
}
