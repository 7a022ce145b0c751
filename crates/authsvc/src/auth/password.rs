// ============================
// crates/authsvc/src/auth/password.rs
// ============================
//! Credential hashing and verification.
//!
//! Secrets are never stored in the clear: the store keeps a PHC-format hash
//! string and authentication re-derives it from the presented secret.
use crate::config::{HashAlgorithm, HasherSettings};
use crate::error::AuthError;
use argon2::{Algorithm, Argon2, Version};
use rand::RngCore;
use scrypt::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Scrypt,
};
use std::sync::Arc;

/// Salt length in bytes
const SALT_BYTES: usize = 16;

/// One-way transform of a plaintext secret into a comparable digest
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext secret with a fresh salt
    fn hash(&self, secret: &str) -> Result<String, AuthError>;

    /// Check a plaintext secret against a stored hash
    fn verify(&self, hash: &str, secret: &str) -> bool;
}

fn fresh_salt() -> Result<SaltString, AuthError> {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    Ok(SaltString::encode_b64(&bytes)?)
}

/// scrypt-based hasher
#[derive(Debug, Clone, Copy)]
pub struct ScryptHasher {
    params: scrypt::Params,
}

impl Default for ScryptHasher {
    fn default() -> Self {
        Self {
            params: scrypt::Params::recommended(),
        }
    }
}

impl ScryptHasher {
    /// Create a hasher with explicit cost parameters
    pub fn with_params(log_n: u8, r: u32, p: u32) -> Result<Self, AuthError> {
        let params = scrypt::Params::new(log_n, r, p, scrypt::Params::RECOMMENDED_LEN)
            .map_err(|e| AuthError::Config(format!("invalid scrypt params: {e}")))?;
        Ok(Self { params })
    }
}

impl CredentialHasher for ScryptHasher {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = fresh_salt()?;
        let hash = Scrypt
            .hash_password_customized(secret.as_bytes(), None, None, self.params, &salt)?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, hash: &str, secret: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Scrypt.verify_password(secret.as_bytes(), &parsed_hash).is_ok()
    }
}

/// argon2id-based hasher
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: argon2::Params,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: argon2::Params::default(),
        }
    }
}

impl Argon2Hasher {
    /// Create a hasher with explicit cost parameters (memory in KiB)
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = argon2::Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Config(format!("invalid argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn engine(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = fresh_salt()?;
        let hash = self
            .engine()
            .hash_password(secret.as_bytes(), &salt)?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, hash: &str, secret: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        // Cost parameters are read back from the hash string itself
        self.engine()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Build the hasher selected in the settings
pub fn hasher_from_settings(settings: &HasherSettings) -> Result<Arc<dyn CredentialHasher>, AuthError> {
    let hasher: Arc<dyn CredentialHasher> = match settings.algorithm {
        HashAlgorithm::Scrypt => Arc::new(ScryptHasher::with_params(
            settings.scrypt_log_n,
            settings.scrypt_r,
            settings.scrypt_p,
        )?),
        HashAlgorithm::Argon2 => Arc::new(Argon2Hasher::with_params(
            settings.argon2_memory_kib,
            settings.argon2_iterations,
            settings.argon2_parallelism,
        )?),
    };
    Ok(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_scrypt() -> ScryptHasher {
        ScryptHasher::with_params(4, 8, 1).unwrap()
    }

    fn fast_argon2() -> Argon2Hasher {
        Argon2Hasher::with_params(64, 1, 1).unwrap()
    }

    #[test]
    fn test_scrypt_hash_and_verify() {
        let hasher = fast_scrypt();
        let hash = hasher.hash("123456").unwrap();

        assert!(hash.starts_with("$scrypt$"));
        assert!(hasher.verify(&hash, "123456"));
        assert!(!hasher.verify(&hash, "12345"));
    }

    #[test]
    fn test_argon2_hash_and_verify() {
        let hasher = fast_argon2();
        let hash = hasher.hash("123456").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "123456"));
        assert!(!hasher.verify(&hash, "1234567"));
    }

    #[test]
    fn test_same_secret_hashes_differently() {
        let hasher = fast_scrypt();
        let a = hasher.hash("secret").unwrap();
        let b = hasher.hash("secret").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify(&a, "secret"));
        assert!(hasher.verify(&b, "secret"));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!fast_scrypt().verify("not-a-phc-string", "secret"));
        assert!(!fast_argon2().verify("", "secret"));
    }

    #[test]
    fn test_invalid_params_are_config_errors() {
        assert!(matches!(
            ScryptHasher::with_params(0, 0, 0),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            Argon2Hasher::with_params(0, 0, 0),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_hasher_from_settings() {
        let mut settings = HasherSettings::fast();
        let hasher = hasher_from_settings(&settings).unwrap();
        let hash = hasher.hash("pw").unwrap();
        assert!(hash.starts_with("$scrypt$"));

        settings.algorithm = HashAlgorithm::Argon2;
        let hasher = hasher_from_settings(&settings).unwrap();
        let hash = hasher.hash("pw").unwrap();
        assert!(hasher.verify(&hash, "pw"));
    }
}
