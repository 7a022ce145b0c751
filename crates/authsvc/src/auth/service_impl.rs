use crate::auth::password::{hasher_from_settings, CredentialHasher};
use crate::auth::rate_limit::AuthRateLimiter;
use crate::auth::reclaim::ReclamationScheduler;
use crate::auth::registry::TokenRegistry;
use crate::auth::token_generator::fingerprint;
use crate::auth::AuthService;
use crate::config::Settings;
use crate::error::AuthError;
use crate::metrics::AUTH_FAILED;
use crate::store::{Principal, PrincipalStore};
use authsvc_common::Role;
use metrics::counter;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// In-memory auth service composing the principal store, hasher and token registry
pub struct DefaultAuth {
    store: RwLock<PrincipalStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<TokenRegistry>,
    rate_limiter: Arc<AuthRateLimiter>,
    scheduler: ReclamationScheduler,
    revoke_tokens_on_user_delete: bool,
}

impl DefaultAuth {
    /// Build the service with the hasher selected in `settings`
    pub fn new(settings: &Settings) -> Result<Self, AuthError> {
        let hasher = hasher_from_settings(&settings.hasher)?;
        Self::with_hasher(settings, hasher)
    }

    /// Build the service around a caller-provided hasher
    pub fn with_hasher(
        settings: &Settings,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, AuthError> {
        settings.validate()?;
        let tokens = Arc::new(TokenRegistry::from_settings(&settings.token)?);
        let rate_limiter = Arc::new(AuthRateLimiter::from_settings(&settings.lockout));
        let scheduler = ReclamationScheduler::new(settings.sweep_interval())
            .with_reclaimer(tokens.clone())
            .with_reclaimer(rate_limiter.clone());

        Ok(Self {
            store: RwLock::new(PrincipalStore::new()),
            hasher,
            tokens,
            rate_limiter,
            scheduler,
            revoke_tokens_on_user_delete: settings.revoke_tokens_on_user_delete,
        })
    }

    /// Start background reclamation on the current tokio runtime
    pub fn start(&self) -> Result<(), AuthError> {
        self.scheduler.start()
    }

    /// Stop background reclamation; the service keeps serving requests
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_reclaiming(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Run one reclamation pass right now on the calling thread
    pub fn reclaim_now(&self) -> usize {
        self.scheduler.run_once()
    }

    /// The token registry shared with the background sweep
    pub fn tokens(&self) -> &Arc<TokenRegistry> {
        &self.tokens
    }

    pub fn validate_token(&self, token: &str) -> bool {
        self.tokens.validate(token)
    }

    /// Change the idle expiry for every outstanding token
    pub fn set_expired_time(&self, expired_time: Duration) {
        self.tokens.set_expired_time(expired_time);
    }

    pub fn principal(&self, name: &str) -> Option<Arc<Principal>> {
        self.store.read().get_principal(name)
    }

    pub fn principal_names(&self) -> Vec<String> {
        self.store.read().principal_names()
    }

    /// Every registered role
    pub fn roles(&self) -> BTreeSet<Role> {
        self.store.read().roles()
    }

    /// Strict role assignment that reports why nothing changed
    pub fn assign_role(&self, user: &str, role: &Role) -> Result<(), AuthError> {
        let store = self.store.read();
        let principal = store
            .get_principal(user)
            .ok_or_else(|| AuthError::NotFound(user.to_string()))?;
        if !store.role_exists(role) {
            return Err(AuthError::RoleNotFound(role.to_string()));
        }
        if !principal.add_role(role.clone()) {
            return Err(AuthError::AlreadyExists(format!("role {role} on {user}")));
        }

        info!(principal = user, role = %role, "Role assigned");
        Ok(())
    }

    /// Take a role away from a user; false if the user is unknown or lacks it
    pub fn remove_role_from_user(&self, user: &str, role: &Role) -> bool {
        let Some(principal) = self.store.read().get_principal(user) else {
            return false;
        };
        let removed = principal.remove_role(role);
        if removed {
            info!(principal = user, role = %role, "Role removed from principal");
        }
        removed
    }

    // validate, resolve, then renew: the three steps every token-gated call takes
    fn session_principal(&self, token: &str) -> Result<Arc<Principal>, AuthError> {
        if !self.tokens.validate(token) {
            debug!(token = fingerprint(token), "Rejected invalid token");
            return Err(AuthError::InvalidToken);
        }
        // swept between validate and get
        let principal = self.tokens.get(token).ok_or(AuthError::InvalidToken)?;
        self.tokens.touch(token);
        Ok(principal)
    }
}

impl AuthService for DefaultAuth {
    fn create_user(&self, name: &str, secret: &str) -> Result<bool, AuthError> {
        if self.store.read().principal_exists(name) {
            return Ok(false);
        }

        // Hash outside the lock; re-check in case another caller won the race
        let secret_hash = self.hasher.hash(secret)?;
        let mut store = self.store.write();
        if store.principal_exists(name) {
            return Ok(false);
        }
        store.put_principal(Principal::new(name, secret_hash));

        info!(principal = name, "User created");
        Ok(true)
    }

    fn delete_user(&self, name: &str) -> bool {
        if self.store.write().remove_principal(name).is_none() {
            return false;
        }
        info!(principal = name, "User deleted");

        if self.revoke_tokens_on_user_delete {
            self.tokens.invalidate_principal(name);
        }
        true
    }

    fn create_role(&self, name: &str) -> bool {
        let created = self.store.write().put_role(Role::new(name));
        if created {
            info!(role = name, "Role created");
        }
        created
    }

    fn delete_role(&self, role: &Role) -> bool {
        let removed = self.store.write().remove_role(role);
        if removed {
            info!(role = %role, "Role deleted");
        }
        removed
    }

    fn add_role_to_user(&self, user: &str, role: &Role) {
        if let Err(err) = self.assign_role(user, role) {
            debug!(principal = user, role = %role, reason = %err, "Role assignment skipped");
        }
    }

    fn authenticate_user(&self, name: &str, secret: &str) -> Result<String, AuthError> {
        if !self.rate_limiter.check_rate_limit(name) {
            counter!(AUTH_FAILED, "reason" => "locked").increment(1);
            warn!(principal = name, "Authentication refused during lockout");
            return Err(AuthError::RateLimited);
        }

        let principal = self.store.read().get_principal(name).ok_or_else(|| {
            counter!(AUTH_FAILED, "reason" => "unknown").increment(1);
            AuthError::NotFound(name.to_string())
        })?;

        if !self.hasher.verify(principal.secret_hash(), secret) {
            counter!(AUTH_FAILED, "reason" => "secret").increment(1);
            self.rate_limiter.record_failed_attempt(name);
            info!(principal = name, "Authentication failed");
            return Err(AuthError::Unauthorized);
        }

        self.rate_limiter.record_success(name);
        let token = self.tokens.issue(principal);
        info!(principal = name, token = fingerprint(&token), "User authenticated");
        Ok(token)
    }

    fn invalidate_token(&self, token: &str) {
        self.tokens.invalidate(token);
    }

    fn check_role(&self, token: &str, role: &Role) -> Result<bool, AuthError> {
        let principal = self.session_principal(token)?;
        Ok(principal.has_role(role))
    }

    fn all_roles(&self, token: &str) -> Result<BTreeSet<Role>, AuthError> {
        let principal = self.session_principal(token)?;
        Ok(principal.roles())
    }
}
