// crates/authsvc/src/error.rs

//! Central error type for the auth service.
use thiserror::Error;

/// Errors surfaced by the auth service with error codes and context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Principal not found: {0}")]
    NotFound(String),

    #[error("Credentials rejected")]
    Unauthorized,

    #[error("Token is missing or expired")]
    InvalidToken,

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Too many failed authentication attempts")]
    RateLimited,

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl AuthError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotFound(_) => "AUTH_001",
            AuthError::Unauthorized => "AUTH_002",
            AuthError::RateLimited => "AUTH_003",
            AuthError::InvalidToken => "TOKEN_001",
            AuthError::AlreadyExists(_) => "STORE_001",
            AuthError::RoleNotFound(_) => "STORE_002",
            AuthError::Hashing(_) => "INT_001",
            AuthError::Config(_) => "CFG_001",
            AuthError::Scheduler(_) => "INT_002",
        }
    }

    /// Get a sanitized message suitable for handing to an untrusted caller
    pub fn sanitized_message(&self) -> String {
        match self {
            // Unknown user and wrong secret look the same from outside.
            AuthError::NotFound(_) | AuthError::Unauthorized => {
                "Authentication failed".to_string()
            },
            AuthError::RateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AuthError::InvalidToken => "Session expired or invalid".to_string(),
            AuthError::AlreadyExists(_) | AuthError::RoleNotFound(_) => {
                "Invalid request".to_string()
            },
            AuthError::Hashing(_) | AuthError::Config(_) | AuthError::Scheduler(_) => {
                "An internal error occurred".to_string()
            },
        }
    }

    /// Whether the error came from the caller's credentials or token rather than the service
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::Hashing(_) | AuthError::Config(_) | AuthError::Scheduler(_)
        )
    }
}

impl From<scrypt::password_hash::Error> for AuthError {
    fn from(err: scrypt::password_hash::Error) -> Self {
        AuthError::Hashing(err.to_string())
    }
}
