// ================
// common/src/lib.rs
// ================
//! Common value types shared between the auth service and its callers.
//! Everything here is plain data: cheap to clone, serializable, and free of
//! any locking or lifecycle concerns.

use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// A named permission group.
///
/// Two roles with the same name are the same role: equality, ordering and
/// hashing all go through the name alone. Role names are case-sensitive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Role {
    name: String,
}

impl Role {
    /// Create a role from its name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The role's unique name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::new(name)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Role::new(name)
    }
}

// Lets `HashSet<Role>`/`BTreeSet<Role>` be queried with a plain `&str`.
impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.name
    }
}
