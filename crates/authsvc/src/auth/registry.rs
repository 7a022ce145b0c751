// ============================
// crates/authsvc/src/auth/registry.rs
// ============================
//! Token to session mapping with sliding expiry.
//!
//! Expiry is enforced twice. Every `validate`/`touch` checks the idle time and
//! evicts a stale entry on the spot, so no caller ever sees an expired session
//! as valid. `sweep_expired` walks the whole map and is driven by the
//! reclamation scheduler to bound memory held by tokens nobody presents again.
//!
//! Sessions live in a sharded `DashMap`, so operations on different tokens
//! rarely contend and no global lock serializes them. Every check-then-act on
//! a single entry happens under that entry's shard lock.
use super::reclaim::Reclaim;
use super::session::Session;
use super::token_generator::{
    fingerprint, generate_secure_token_with_size, DEFAULT_TOKEN_BYTES, MIN_TOKEN_BYTES,
};
use crate::config::TokenSettings;
use crate::error::AuthError;
use crate::metrics::{SESSION_ACTIVE, TOKEN_EXPIRED, TOKEN_INVALIDATED, TOKEN_ISSUED};
use crate::store::Principal;
use dashmap::{mapref::entry::Entry, DashMap};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default idle expiry (2 hours)
pub const DEFAULT_EXPIRED_TIME: Duration = Duration::from_secs(2 * 60 * 60);

/// Registry of issued tokens
#[derive(Debug)]
pub struct TokenRegistry {
    sessions: DashMap<String, Session>,
    /// Idle threshold in milliseconds, shared by lazy checks and sweeps
    expired_ms: AtomicU64,
    token_bytes: usize,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRED_TIME)
    }
}

impl TokenRegistry {
    /// Create an empty registry with the given idle expiry
    pub fn new(expired_time: Duration) -> Self {
        Self::empty(expired_time, DEFAULT_TOKEN_BYTES)
    }

    /// Create an empty registry issuing tokens of `token_bytes` random bytes;
    /// sizes below [`MIN_TOKEN_BYTES`] are rejected
    pub fn with_token_bytes(expired_time: Duration, token_bytes: usize) -> Result<Self, AuthError> {
        if token_bytes < MIN_TOKEN_BYTES {
            return Err(AuthError::Config(format!(
                "token size {token_bytes} is below the minimum of {MIN_TOKEN_BYTES} bytes"
            )));
        }
        Ok(Self::empty(expired_time, token_bytes))
    }

    pub fn from_settings(settings: &TokenSettings) -> Result<Self, AuthError> {
        Self::with_token_bytes(
            Duration::from_millis(settings.expiry_ms),
            settings.token_bytes,
        )
    }

    fn empty(expired_time: Duration, token_bytes: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            expired_ms: AtomicU64::new(duration_to_millis(expired_time)),
            token_bytes,
        }
    }

    fn expired_ms(&self) -> u64 {
        self.expired_ms.load(Ordering::Acquire)
    }

    /// Current idle expiry threshold
    pub fn expired_time(&self) -> Duration {
        Duration::from_millis(self.expired_ms())
    }

    /// Change the idle expiry for every session, effective on the next check
    pub fn set_expired_time(&self, expired_time: Duration) {
        let millis = duration_to_millis(expired_time);
        let previous = self.expired_ms.swap(millis, Ordering::AcqRel);
        info!(previous_ms = previous, expired_ms = millis, "Token expiry updated");
    }

    /// Create a session for `principal` and return its fresh token
    pub fn issue(&self, principal: Arc<Principal>) -> String {
        let now = Instant::now();
        let name = principal.name().to_string();

        // A collision needs 2^128 draws on average; regenerate rather than overwrite.
        let token = loop {
            let candidate = generate_secure_token_with_size(self.token_bytes);
            if let Entry::Vacant(slot) = self.sessions.entry(candidate) {
                let token = slot.key().clone();
                slot.insert(Session::new(principal, now));
                break token;
            }
        };

        debug!(token = fingerprint(&token), principal = %name, "Issued token");
        counter!(TOKEN_ISSUED).increment(1);
        self.report_active();
        token
    }

    /// True iff the token is mapped and has not been idle for the expiry window.
    ///
    /// An expired mapping is removed as a side effect.
    pub fn validate(&self, token: &str) -> bool {
        let now = Instant::now();
        let expired = match self.sessions.get(token) {
            Some(session) => session.is_expired(now, self.expired_ms()),
            None => return false,
        };

        if expired {
            self.evict_expired(token, now);
            return false;
        }
        true
    }

    /// Renew a valid token's idle window; returns whether the token was renewed.
    ///
    /// Unknown or expired tokens are left alone (expired ones get evicted).
    pub fn touch(&self, token: &str) -> bool {
        let now = Instant::now();
        let expired = match self.sessions.get_mut(token) {
            Some(mut session) => {
                if session.is_expired(now, self.expired_ms()) {
                    true
                } else {
                    session.touch(now);
                    false
                }
            },
            None => return false,
        };

        if expired {
            self.evict_expired(token, now);
            return false;
        }
        true
    }

    /// Principal bound to the token, without checking or refreshing expiry
    pub fn get(&self, token: &str) -> Option<Arc<Principal>> {
        self.sessions
            .get(token)
            .map(|session| Arc::clone(session.principal()))
    }

    /// Snapshot of the session behind a token, without checking expiry
    pub fn session(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|session| session.value().clone())
    }

    /// Remove the token if present; returns whether anything was removed
    pub fn invalidate(&self, token: &str) -> bool {
        if self.sessions.remove(token).is_none() {
            return false;
        }

        debug!(token = fingerprint(token), "Token invalidated");
        counter!(TOKEN_INVALIDATED).increment(1);
        self.report_active();
        true
    }

    /// Remove every token bound to the named principal
    pub fn invalidate_principal(&self, name: &str) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = session.principal().name() != name;
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            info!(principal = name, removed, "Revoked principal tokens");
            counter!(TOKEN_INVALIDATED).increment(removed as u64);
            self.report_active();
        }
        removed
    }

    /// Remove every session idle for at least the expiry window
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired_ms = self.expired_ms();
        let mut removed = 0;

        // retain locks one shard at a time; sessions touched after `now` are never idle
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired(now, expired_ms);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            counter!(TOKEN_EXPIRED, "path" => "sweep").increment(removed as u64);
        }
        self.report_active();
        debug!(removed, remaining = self.sessions.len(), "Swept expired tokens");
        removed
    }

    /// Number of mapped tokens, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // Re-checks under the shard lock so a concurrent renewal wins over eviction.
    fn evict_expired(&self, token: &str, now: Instant) {
        let expired_ms = self.expired_ms();
        if self
            .sessions
            .remove_if(token, |_, session| session.is_expired(now, expired_ms))
            .is_some()
        {
            debug!(token = fingerprint(token), "Evicted expired token");
            counter!(TOKEN_EXPIRED, "path" => "lazy").increment(1);
            self.report_active();
        }
    }

    fn report_active(&self) {
        gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
    }
}

impl Reclaim for TokenRegistry {
    fn name(&self) -> &str {
        "token-registry"
    }

    fn reclaim(&self) -> usize {
        self.sweep_expired()
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
