//! Fixed-window rate limiting for authentication endpoints.
//!
//! Each `(scope, key)` pair owns one counting window that resets wholesale
//! once its duration elapses. Expiry is lazy: an expired window counts as
//! zero regardless of its stored value, so no background sweep is required
//! for correctness (`sweep` exists only to reclaim memory).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// What kind of attempt a counter tracks. Password reset keeps separate
/// per-IP and per-email scopes; a request is limited if either trips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateScope {
    Login,
    PasswordResetIp,
    PasswordResetEmail,
    MediaMutation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub threshold: u32,
}

impl RateLimitPolicy {
    /// Built-in policy per scope: short window with a low threshold for
    /// logins, a longer window for password resets.
    #[must_use]
    pub const fn for_scope(scope: RateScope) -> Self {
        match scope {
            RateScope::Login => Self {
                window: Duration::from_secs(60),
                threshold: 5,
            },
            RateScope::PasswordResetIp => Self {
                window: Duration::from_secs(15 * 60),
                threshold: 10,
            },
            RateScope::PasswordResetEmail => Self {
                window: Duration::from_secs(15 * 60),
                threshold: 3,
            },
            RateScope::MediaMutation => Self {
                window: Duration::from_secs(60),
                threshold: 30,
            },
        }
    }
}

/// Attempt tracking per key. Implementations must make `record_attempt`
/// logically atomic per key under concurrent requests.
pub trait RateLimiter: Send + Sync {
    /// True when the key's live window has reached the scope threshold.
    fn is_limited(&self, scope: RateScope, key: &str) -> bool;

    /// Count one attempt, starting a fresh window if the old one expired.
    fn record_attempt(&self, scope: RateScope, key: &str);

    /// Clear the counter, called on successful authentication so earlier
    /// failures stop penalizing a legitimate user.
    fn reset(&self, scope: RateScope, key: &str);
}

/// Limiter that never limits, for tests and the auth kill switch.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn is_limited(&self, _scope: RateScope, _key: &str) -> bool {
        false
    }

    fn record_attempt(&self, _scope: RateScope, _key: &str) {}

    fn reset(&self, _scope: RateScope, _key: &str) {}
}

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// In-process limiter backed by a mutex-guarded map. The mutex makes each
/// increment atomic per key; counts never go negative and only increase
/// until the window resets.
pub struct InMemoryRateLimiter {
    policies: HashMap<RateScope, RateLimitPolicy>,
    windows: Mutex<HashMap<(RateScope, String), Window>>,
}

impl InMemoryRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        let policies = [
            RateScope::Login,
            RateScope::PasswordResetIp,
            RateScope::PasswordResetEmail,
            RateScope::MediaMutation,
        ]
        .into_iter()
        .map(|scope| (scope, RateLimitPolicy::for_scope(scope)))
        .collect();
        Self {
            policies,
            windows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, scope: RateScope, policy: RateLimitPolicy) -> Self {
        self.policies.insert(scope, policy);
        self
    }

    fn policy(&self, scope: RateScope) -> RateLimitPolicy {
        self.policies
            .get(&scope)
            .copied()
            .unwrap_or_else(|| RateLimitPolicy::for_scope(scope))
    }

    /// Drop expired windows to reclaim memory. Optional; correctness does
    /// not depend on it.
    pub fn sweep(&self) {
        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        };
        let policies = &self.policies;
        windows.retain(|(scope, _), window| {
            let policy = policies
                .get(scope)
                .copied()
                .unwrap_or_else(|| RateLimitPolicy::for_scope(*scope));
            window.started_at.elapsed() <= policy.window
        });
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn is_limited(&self, scope: RateScope, key: &str) -> bool {
        let policy = self.policy(scope);
        let windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        };
        match windows.get(&(scope, key.to_string())) {
            // Expired windows count as zero no matter what they stored.
            Some(window) if window.started_at.elapsed() <= policy.window => {
                window.count >= policy.threshold
            }
            _ => false,
        }
    }

    fn record_attempt(&self, scope: RateScope, key: &str) {
        let policy = self.policy(scope);
        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = windows
            .entry((scope, key.to_string()))
            .or_insert(Window {
                count: 0,
                started_at: Instant::now(),
            });
        if entry.started_at.elapsed() > policy.window {
            *entry = Window {
                count: 1,
                started_at: Instant::now(),
            };
        } else {
            entry.count = entry.count.saturating_add(1);
        }
    }

    fn reset(&self, scope: RateScope, key: &str) {
        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        };
        windows.remove(&(scope, key.to_string()));
    }
}
