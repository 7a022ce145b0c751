// ============================
// crates/authsvc/src/auth/session.rs
// ============================
//! Server-side state behind one issued token.
use crate::store::Principal;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Session information
#[derive(Clone)]
pub struct Session {
    principal: Arc<Principal>,
    issued_at: Instant,
    last_activity: Instant,
}

impl Session {
    pub fn new(principal: Arc<Principal>, now: Instant) -> Self {
        Self {
            principal,
            issued_at: now,
            last_activity: now,
        }
    }

    /// The principal this session authenticates
    pub fn principal(&self) -> &Arc<Principal> {
        &self.principal
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Whole milliseconds since the last successful use
    pub fn idle_millis(&self, now: Instant) -> u64 {
        let idle = now.saturating_duration_since(self.last_activity);
        u64::try_from(idle.as_millis()).unwrap_or(u64::MAX)
    }

    /// Expired once idle for at least `expired_ms`
    pub fn is_expired(&self, now: Instant, expired_ms: u64) -> bool {
        self.idle_millis(now) >= expired_ms
    }

    /// Record activity; never moves `last_activity` backwards
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Time left before expiry under the given threshold
    pub fn remaining(&self, now: Instant, expired_ms: u64) -> Duration {
        Duration::from_millis(expired_ms.saturating_sub(self.idle_millis(now)))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("principal", &self.principal.name())
            .field("issued_at", &self.issued_at)
            .field("last_activity", &self.last_activity)
            .finish()
    }
}
