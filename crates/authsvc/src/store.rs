// ============================
// crates/authsvc/src/store.rs
// ============================
//! In-memory principal and role storage.
//!
//! `PrincipalStore` is a plain keyed container: mutators take `&mut self` and
//! callers that share it across threads wrap it in a lock. Principals are
//! handed out as `Arc<Principal>` so sessions can keep a principal alive after
//! it has been removed from the store.
use authsvc_common::Role;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// An authenticable identity
pub struct Principal {
    name: String,
    secret_hash: String,
    roles: RwLock<BTreeSet<Role>>,
}

impl Principal {
    /// Create a principal with an already-hashed secret and no roles
    pub fn new(name: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret_hash: secret_hash.into(),
            roles: RwLock::new(BTreeSet::new()),
        }
    }

    /// The principal's unique, immutable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored secret hash (PHC string)
    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.read().contains(role)
    }

    /// Snapshot of the current role set
    pub fn roles(&self) -> BTreeSet<Role> {
        self.roles.read().clone()
    }

    /// Add a role; false if it was already held
    pub fn add_role(&self, role: Role) -> bool {
        self.roles.write().insert(role)
    }

    /// Remove a role; false if it was not held
    pub fn remove_role(&self, role: &Role) -> bool {
        self.roles.write().remove(role)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("name", &self.name)
            .field("secret_hash", &"<redacted>")
            .field("roles", &*self.roles.read())
            .finish()
    }
}

/// Users keyed by name plus the registry of known roles
#[derive(Debug, Default)]
pub struct PrincipalStore {
    principals: HashMap<String, Arc<Principal>>,
    roles: HashSet<Role>,
}

impl PrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal_exists(&self, name: &str) -> bool {
        self.principals.contains_key(name)
    }

    pub fn get_principal(&self, name: &str) -> Option<Arc<Principal>> {
        self.principals.get(name).cloned()
    }

    /// Store a principal under its name, returning whatever it replaced
    pub fn put_principal(&mut self, principal: Principal) -> Option<Arc<Principal>> {
        self.principals
            .insert(principal.name().to_string(), Arc::new(principal))
    }

    pub fn remove_principal(&mut self, name: &str) -> Option<Arc<Principal>> {
        self.principals.remove(name)
    }

    pub fn role_exists(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Register a role; false if it already existed
    pub fn put_role(&mut self, role: Role) -> bool {
        self.roles.insert(role)
    }

    /// Unregister a role; false if it was not registered
    pub fn remove_role(&mut self, role: &Role) -> bool {
        self.roles.remove(role)
    }

    /// Names of all registered principals, sorted
    pub fn principal_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.principals.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered roles
    pub fn roles(&self) -> BTreeSet<Role> {
        self.roles.iter().cloned().collect()
    }

    pub fn principal_count(&self) -> usize {
        self.principals.len()
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }
}
