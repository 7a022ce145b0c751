// ============================
// crates/authsvc/src/lib.rs
// ============================
//! In-process authentication and authorization service.
//!
//! Users and roles live in a [`store::PrincipalStore`]; authentication issues
//! opaque bearer tokens tracked by an [`auth::TokenRegistry`] with sliding
//! idle expiry; an [`auth::ReclamationScheduler`] sweeps expired tokens in the
//! background. [`auth::DefaultAuth`] ties them together behind the
//! [`auth::AuthService`] trait. All state is in memory.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod telemetry;

pub use auth::{AuthService, DefaultAuth, TokenRegistry};
pub use authsvc_common::Role;
pub use config::Settings;
pub use error::AuthError;
