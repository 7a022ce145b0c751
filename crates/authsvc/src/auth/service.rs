//! This module defines the `AuthService` trait, the public face of the auth service
use crate::error::AuthError;
use authsvc_common::Role;
use std::collections::BTreeSet;

/// User, role and token operations.
///
/// Names are case-sensitive exact-match strings. Mutations that fail a
/// precondition report it as `false` rather than an error.
pub trait AuthService: Send + Sync {
    /// Register a user; `Ok(false)` if the name is taken
    fn create_user(&self, name: &str, secret: &str) -> Result<bool, AuthError>;

    /// Remove a user; false if no such user
    fn delete_user(&self, name: &str) -> bool;

    /// Register a role; false if it already exists
    fn create_role(&self, name: &str) -> bool;

    /// Unregister a role; false if it was not registered
    fn delete_role(&self, role: &Role) -> bool;

    /// Give a registered user a registered role; silently does nothing otherwise
    fn add_role_to_user(&self, user: &str, role: &Role);

    /// Check credentials and issue a fresh token
    fn authenticate_user(&self, name: &str, secret: &str) -> Result<String, AuthError>;

    /// Revoke a token; unknown or expired tokens are ignored
    fn invalidate_token(&self, token: &str);

    /// Whether the token's principal holds `role`; renews the token
    fn check_role(&self, token: &str, role: &Role) -> Result<bool, AuthError>;

    /// Snapshot of the token principal's roles; renews the token
    fn all_roles(&self, token: &str) -> Result<BTreeSet<Role>, AuthError>;
}
