// ============================
// crates/authsvc/src/auth/rate_limit.rs
// ============================
//! Lockout after repeated failed authentication attempts.

use super::reclaim::Reclaim;
use crate::config::LockoutSettings;
use crate::metrics::AUTH_LOCKOUT;
use dashmap::DashMap;
use metrics::counter;
use std::time::{Duration, Instant};
use tracing::warn;

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

/// How long a failure streak is remembered without a lockout
const FAILURE_MEMORY: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of failed attempts
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires, if locked
    lockout_expiry: Option<Instant>,
}

/// Failed-attempt tracker keyed by principal name
#[derive(Debug)]
pub struct AuthRateLimiter {
    attempts: DashMap<String, RateLimitEntry>,
    /// Maximum number of failed attempts before lockout; 0 disables tracking
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &LockoutSettings) -> Self {
        Self::new(
            settings.max_failed_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Record a failed authentication; returns true if this locked the name out
    pub fn record_failed_attempt(&self, name: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(name.to_string())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // A finished lockout starts a fresh streak
        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.lockout_expiry.is_none() && entry.failed_attempts >= self.max_attempts {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            let attempts = entry.failed_attempts;
            drop(entry);

            warn!(
                principal = name,
                attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "Principal locked out after failed authentications"
            );
            counter!(AUTH_LOCKOUT).increment(1);
            return true;
        }
        false
    }

    /// Record a successful authentication, clearing any failure streak
    pub fn record_success(&self, name: &str) {
        self.attempts.remove(name);
    }

    /// Whether the name may attempt authentication right now
    pub fn check_rate_limit(&self, name: &str) -> bool {
        match self.attempts.get(name) {
            Some(entry) => !entry
                .lockout_expiry
                .is_some_and(|expiry| Instant::now() < expiry),
            None => true,
        }
    }

    /// Failed attempts in the current streak
    pub fn failed_attempts(&self, name: &str) -> u32 {
        self.attempts
            .get(name)
            .map_or(0, |entry| entry.failed_attempts)
    }

    /// Drop finished lockouts and stale failure streaks
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.attempts.retain(|_, entry| {
            let keep = match entry.lockout_expiry {
                Some(expiry) => now < expiry,
                None => now.saturating_duration_since(entry.last_failure) < FAILURE_MEMORY,
            };
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }
}

impl Reclaim for AuthRateLimiter {
    fn name(&self) -> &str {
        "auth-rate-limiter"
    }

    fn reclaim(&self) -> usize {
        self.cleanup()
    }
}
