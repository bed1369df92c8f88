/// Login-attempt tracking and lockout.
///
/// Counters live in a shared in-memory map; increments are atomic per key
/// because every mutation happens under the one mutex. For multi-process
/// deployments the counters would move to a shared cache, keeping the same
/// contract.
///
/// The guard is consulted BEFORE credential verification, so a locked-out
/// account answers with the same generic failure whether or not the
/// supplied password would have matched.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::configuration::SecuritySettings;

pub struct LoginGuardConfig {
    /// Consecutive failures that trigger a lockout.
    pub max_attempts: u32,
    pub lockout: Duration,
}

struct AttemptState {
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

pub struct LoginGuard {
    config: LoginGuardConfig,
    attempts: Mutex<HashMap<String, AttemptState>>,
}

impl LoginGuard {
    pub fn new(config: LoginGuardConfig) -> Self {
        Self {
            config,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &SecuritySettings) -> Self {
        Self::new(LoginGuardConfig {
            max_attempts: settings.max_login_attempts,
            lockout: Duration::seconds(settings.lockout_duration),
        })
    }

    /// Whether the identity key is currently locked out. An elapsed lock no
    /// longer blocks, but the failure count stays until a success clears it.
    pub fn is_locked(&self, identity_key: &str) -> bool {
        let attempts = self.attempts.lock().unwrap();

        match attempts.get(identity_key).and_then(|s| s.locked_until) {
            Some(until) => until > Utc::now(),
            None => false,
        }
    }

    /// Records a failed credential check. Returns true when this failure
    /// tripped the lockout threshold.
    pub fn record_failure(&self, identity_key: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap();

        let state = attempts
            .entry(identity_key.to_string())
            .or_insert(AttemptState {
                failures: 0,
                locked_until: None,
            });

        state.failures += 1;
        if state.failures >= self.config.max_attempts {
            state.locked_until = Some(Utc::now() + self.config.lockout);
            tracing::warn!(
                target: "security",
                identity_key = identity_key,
                failures = state.failures,
                "login lockout triggered"
            );
            return true;
        }
        false
    }

    /// Records a successful authentication, resetting the counter to zero.
    pub fn record_success(&self, identity_key: &str) {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.remove(identity_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(max_attempts: u32, lockout_secs: i64) -> LoginGuard {
        LoginGuard::new(LoginGuardConfig {
            max_attempts,
            lockout: Duration::seconds(lockout_secs),
        })
    }

    #[test]
    fn unlocked_by_default() {
        let g = guard(3, 300);
        assert!(!g.is_locked("alice@example.com"));
    }

    #[test]
    fn locks_after_threshold() {
        let g = guard(3, 300);

        assert!(!g.record_failure("alice@example.com"));
        assert!(!g.record_failure("alice@example.com"));
        assert!(!g.is_locked("alice@example.com"));

        // Third failure trips the lock.
        assert!(g.record_failure("alice@example.com"));
        assert!(g.is_locked("alice@example.com"));
    }

    #[test]
    fn counters_are_per_key() {
        let g = guard(3, 300);

        for _ in 0..3 {
            g.record_failure("alice@example.com");
        }
        assert!(g.is_locked("alice@example.com"));
        assert!(!g.is_locked("bob@example.com"));
    }

    #[test]
    fn success_resets_counter() {
        let g = guard(3, 300);

        g.record_failure("alice@example.com");
        g.record_failure("alice@example.com");
        g.record_success("alice@example.com");

        // Two more failures alone must not lock after the reset.
        assert!(!g.record_failure("alice@example.com"));
        assert!(!g.record_failure("alice@example.com"));
        assert!(!g.is_locked("alice@example.com"));
    }

    #[test]
    fn lock_expires_after_duration() {
        let g = guard(2, 1);

        g.record_failure("alice@example.com");
        g.record_failure("alice@example.com");
        assert!(g.is_locked("alice@example.com"));

        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(!g.is_locked("alice@example.com"));

        // Counter survived the elapsed lock; one more failure re-locks.
        assert!(g.record_failure("alice@example.com"));
        assert!(g.is_locked("alice@example.com"));

        std::thread::sleep(std::time::Duration::from_millis(1100));
        g.record_success("alice@example.com");

        // Back to a clean slate: a single failure stays below the threshold.
        assert!(!g.record_failure("alice@example.com"));
        assert!(!g.is_locked("alice@example.com"));
    }
}
