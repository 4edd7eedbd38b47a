//! Fixed-window rate limiting keyed by client address.
//!
//! Each route class has an independent budget. Counters live behind the
//! [`CounterStore`] trait; the in-process [`LocalCounterStore`] suits a
//! single instance, and multi-instance deployments can implement the trait
//! over a shared counter without touching the middleware.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Route classes with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Authentication routes (register/login/refresh/logout).
    Auth,
    /// Post creation.
    PostCreate,
    /// Comments.
    Comment,
    /// Likes.
    Like,
    /// Everything else under the API.
    General,
}

impl RouteClass {
    /// Stable name used in counter keys and security events.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Auth => "auth",
            RouteClass::PostCreate => "post_create",
            RouteClass::Comment => "comment",
            RouteClass::Like => "like",
            RouteClass::General => "general",
        }
    }
}

/// Budget for one route class.
#[derive(Debug, Clone, Copy)]
pub struct RouteBudget {
    /// Maximum requests per window.
    pub max: u32,
    /// Window length.
    pub window: Duration,
}

impl RouteBudget {
    /// Create a budget.
    pub fn new(max: u32, window_secs: u64) -> Self {
        Self {
            max,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Result of recording one request against a window.
#[derive(Debug, Clone, Copy)]
pub struct WindowHit {
    /// Requests seen in the current window, including this one.
    pub count: u32,
    /// Time until the window resets.
    pub resets_in: Duration,
}

/// Counter storage for fixed windows.
///
/// `hit` records one request under `key` and returns the running count for
/// the current window. Implementations must be safe to share across
/// request tasks.
pub trait CounterStore: Send + Sync {
    /// Record a request and return the window state.
    fn hit(&self, key: &str, window: Duration) -> WindowHit;

    /// Drop windows that have expired (memory reclamation).
    fn prune(&self);
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started: Instant,
    count: u32,
}

/// Process-local fixed-window counter store.
#[derive(Debug, Default)]
pub struct LocalCounterStore {
    windows: RwLock<HashMap<String, WindowState>>,
}

impl LocalCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for LocalCounterStore {
    fn hit(&self, key: &str, window: Duration) -> WindowHit {
        let now = Instant::now();
        let mut windows = self.windows.write().unwrap();

        let state = windows
            .entry(key.to_string())
            .or_insert(WindowState { started: now, count: 0 });

        let elapsed = now.duration_since(state.started);
        if elapsed >= window {
            // New fixed window
            state.started = now;
            state.count = 0;
        }

        state.count += 1;
        let resets_in = window.saturating_sub(now.duration_since(state.started));

        WindowHit {
            count: state.count,
            resets_in,
        }
    }

    fn prune(&self) {
        let now = Instant::now();
        let mut windows = self.windows.write().unwrap();
        // A day comfortably exceeds every configured window
        windows.retain(|_, state| now.duration_since(state.started) < Duration::from_secs(86400));
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is within budget.
    Allowed,
    /// Budget exceeded.
    Denied {
        /// Time until the window resets.
        retry_after: Duration,
    },
}

impl RateLimitResult {
    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Per-route-class rate limiter.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    auth: RouteBudget,
    post_create: RouteBudget,
    comment: RouteBudget,
    like: RouteBudget,
    general: RouteBudget,
}

impl RateLimiter {
    /// Create a limiter over the given store with configured budgets.
    pub fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            auth: RouteBudget::new(config.auth_max, config.auth_window_secs),
            post_create: RouteBudget::new(config.post_create_max, config.post_create_window_secs),
            comment: RouteBudget::new(config.comment_max, config.comment_window_secs),
            like: RouteBudget::new(config.like_max, config.like_window_secs),
            general: RouteBudget::new(config.general_max, config.general_window_secs),
        }
    }

    /// Create a limiter with a fresh process-local store.
    pub fn local(config: &RateLimitConfig) -> Self {
        Self::new(Arc::new(LocalCounterStore::new()), config)
    }

    /// Budget for a route class.
    pub fn budget(&self, class: RouteClass) -> RouteBudget {
        match class {
            RouteClass::Auth => self.auth,
            RouteClass::PostCreate => self.post_create,
            RouteClass::Comment => self.comment,
            RouteClass::Like => self.like,
            RouteClass::General => self.general,
        }
    }

    /// Record a request and check it against the class budget.
    pub fn check(&self, class: RouteClass, ip: &str) -> RateLimitResult {
        let budget = self.budget(class);
        let key = format!("{}:{}", class.as_str(), ip);
        let hit = self.store.hit(&key, budget.window);

        if hit.count > budget.max {
            RateLimitResult::Denied {
                retry_after: hit.resets_in,
            }
        } else {
            RateLimitResult::Allowed
        }
    }

    /// Reclaim expired windows.
    pub fn prune(&self) {
        self.store.prune();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("auth", &self.auth)
            .field("post_create", &self.post_create)
            .field("comment", &self.comment)
            .field("like", &self.like)
            .field("general", &self.general)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter_with(auth_max: u32, auth_window_secs: u64) -> RateLimiter {
        let config = RateLimitConfig {
            auth_max,
            auth_window_secs,
            ..Default::default()
        };
        RateLimiter::local(&config)
    }

    #[test]
    fn test_allows_up_to_budget() {
        let limiter = limiter_with(3, 60);

        assert!(limiter.check(RouteClass::Auth, "1.2.3.4").is_allowed());
        assert!(limiter.check(RouteClass::Auth, "1.2.3.4").is_allowed());
        assert!(limiter.check(RouteClass::Auth, "1.2.3.4").is_allowed());

        let result = limiter.check(RouteClass::Auth, "1.2.3.4");
        assert!(!result.is_allowed());
        match result {
            RateLimitResult::Denied { retry_after } => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            RateLimitResult::Allowed => panic!("expected Denied"),
        }
    }

    #[test]
    fn test_ips_are_independent() {
        let limiter = limiter_with(1, 60);

        assert!(limiter.check(RouteClass::Auth, "1.1.1.1").is_allowed());
        assert!(!limiter.check(RouteClass::Auth, "1.1.1.1").is_allowed());
        assert!(limiter.check(RouteClass::Auth, "2.2.2.2").is_allowed());
    }

    #[test]
    fn test_classes_are_independent() {
        let limiter = limiter_with(1, 60);

        assert!(limiter.check(RouteClass::Auth, "1.1.1.1").is_allowed());
        assert!(!limiter.check(RouteClass::Auth, "1.1.1.1").is_allowed());

        // Other classes keep their own budget for the same IP
        assert!(limiter.check(RouteClass::General, "1.1.1.1").is_allowed());
        assert!(limiter.check(RouteClass::PostCreate, "1.1.1.1").is_allowed());
    }

    #[test]
    fn test_window_expiry_resets_budget() {
        let store = LocalCounterStore::new();
        let window = Duration::from_millis(50);

        assert_eq!(store.hit("k", window).count, 1);
        assert_eq!(store.hit("k", window).count, 2);

        std::thread::sleep(Duration::from_millis(60));

        // New fixed window
        assert_eq!(store.hit("k", window).count, 1);
    }

    #[test]
    fn test_default_budgets() {
        let limiter = RateLimiter::local(&RateLimitConfig::default());

        assert_eq!(limiter.budget(RouteClass::Auth).max, 100);
        assert_eq!(limiter.budget(RouteClass::PostCreate).max, 10);
        assert_eq!(
            limiter.budget(RouteClass::PostCreate).window,
            Duration::from_secs(3600)
        );
        assert_eq!(limiter.budget(RouteClass::Comment).max, 30);
        assert_eq!(limiter.budget(RouteClass::Like).max, 100);
        assert_eq!(limiter.budget(RouteClass::General).max, 300);
    }

    #[test]
    fn test_prune_keeps_recent_windows() {
        let limiter = limiter_with(2, 60);
        limiter.check(RouteClass::Auth, "1.2.3.4");
        limiter.prune();
        // The window survives pruning; the second hit is still counted
        assert!(limiter.check(RouteClass::Auth, "1.2.3.4").is_allowed());
        assert!(!limiter.check(RouteClass::Auth, "1.2.3.4").is_allowed());
    }

    #[test]
    fn test_route_class_names() {
        assert_eq!(RouteClass::Auth.as_str(), "auth");
        assert_eq!(RouteClass::PostCreate.as_str(), "post_create");
        assert_eq!(RouteClass::Comment.as_str(), "comment");
        assert_eq!(RouteClass::Like.as_str(), "like");
        assert_eq!(RouteClass::General.as_str(), "general");
    }
}
