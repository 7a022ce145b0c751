// ==============
// crates/authsvc/src/metrics.rs

//! Central place for metric keys
pub const TOKEN_ISSUED: &str = "token.issued";
pub const TOKEN_INVALIDATED: &str = "token.invalidated";
pub const TOKEN_EXPIRED: &str = "token.expired";
pub const SESSION_ACTIVE: &str = "session.active";
pub const AUTH_FAILED: &str = "auth.failed";
pub const AUTH_LOCKOUT: &str = "auth.lockout";
pub const SWEEP_RUN: &str = "reclaim.sweep";
pub const SWEEP_FAILED: &str = "reclaim.sweep_failed";
