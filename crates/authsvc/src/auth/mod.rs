// ============================
// crates/authsvc/src/auth/mod.rs
// ============================
//! Authentication module.
pub mod password;
pub mod rate_limit;
pub mod reclaim;
pub mod registry;
mod service;
mod service_impl;
pub mod session;
pub mod token_generator;

pub use password::{hasher_from_settings, Argon2Hasher, CredentialHasher, ScryptHasher};
pub use rate_limit::AuthRateLimiter;
pub use reclaim::{Reclaim, ReclamationScheduler, DEFAULT_RECLAIM_PERIOD};
pub use registry::{TokenRegistry, DEFAULT_EXPIRED_TIME};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use session::Session;
