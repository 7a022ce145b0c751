// ============================
// crates/authsvc/src/config.rs
// ============================
//! Configuration management.
use crate::auth::token_generator::{DEFAULT_TOKEN_BYTES, MIN_TOKEN_BYTES};
use crate::error::AuthError;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file looked up by [`Settings::load`]
pub const DEFAULT_CONFIG_FILE: &str = "authsvc.toml";

/// Prefix for environment overrides, nested keys split on `__`
pub const ENV_PREFIX: &str = "AUTHSVC_";

const TWO_HOURS_MS: u64 = 2 * 60 * 60 * 1000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Token lifetime and reclamation
    pub token: TokenSettings,
    /// Credential hashing
    pub hasher: HasherSettings,
    /// Failed-authentication lockout
    pub lockout: LockoutSettings,
    /// Revoke every token of a principal when it is deleted
    pub revoke_tokens_on_user_delete: bool,
}

/// Token lifetime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Idle time after which a session expires
    pub expiry_ms: u64,
    /// Random bytes per token
    pub token_bytes: usize,
    /// Period of the background sweep
    pub sweep_interval_ms: u64,
}

/// Supported hashing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Scrypt,
    Argon2,
}

/// Credential hasher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherSettings {
    pub algorithm: HashAlgorithm,
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

/// Lockout after repeated failed authentications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutSettings {
    /// Failures before a name is locked; 0 (the default) disables lockout
    pub max_failed_attempts: u32,
    /// How long a lock lasts
    pub lockout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            token: TokenSettings::default(),
            hasher: HasherSettings::default(),
            lockout: LockoutSettings::default(),
            revoke_tokens_on_user_delete: false,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            expiry_ms: TWO_HOURS_MS,
            token_bytes: DEFAULT_TOKEN_BYTES,
            sweep_interval_ms: TWO_HOURS_MS,
        }
    }
}

impl Default for HasherSettings {
    fn default() -> Self {
        // scrypt recommended costs; argon2 costs follow the argon2 crate defaults
        Self {
            algorithm: HashAlgorithm::Scrypt,
            scrypt_log_n: 17,
            scrypt_r: 8,
            scrypt_p: 1,
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl HasherSettings {
    /// Deliberately weak costs, for tests and local tooling only
    pub fn fast() -> Self {
        Self {
            scrypt_log_n: 4,
            argon2_memory_kib: 64,
            argon2_iterations: 1,
            ..Self::default()
        }
    }
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 0,
            lockout_secs: 5 * 60,
        }
    }
}

impl Settings {
    /// Load settings from `authsvc.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a TOML file (if present) with environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("failed to load settings from {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<(), AuthError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AuthError::Config(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }
        if self.token.expiry_ms == 0 {
            return Err(AuthError::Config("token.expiry_ms must be positive".into()));
        }
        if self.token.sweep_interval_ms == 0 {
            return Err(AuthError::Config(
                "token.sweep_interval_ms must be positive".into(),
            ));
        }
        if self.token.token_bytes < MIN_TOKEN_BYTES {
            return Err(AuthError::Config(format!(
                "token.token_bytes must be at least {MIN_TOKEN_BYTES}"
            )));
        }
        if self.lockout.max_failed_attempts > 0 && self.lockout.lockout_secs == 0 {
            return Err(AuthError::Config(
                "lockout.lockout_secs must be positive when lockout is enabled".into(),
            ));
        }
        // Surfaces bad cost parameters as Config errors
        crate::auth::password::hasher_from_settings(&self.hasher)?;
        Ok(())
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.token.expiry_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.token.sweep_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.expiry(), Duration::from_secs(2 * 60 * 60));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(2 * 60 * 60));
        assert_eq!(settings.token.token_bytes, 32);
        assert_eq!(settings.hasher.algorithm, HashAlgorithm::Scrypt);
        assert_eq!(settings.lockout.max_failed_attempts, 0);
        assert!(!settings.revoke_tokens_on_user_delete);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let settings = Settings::default();

        let mut invalid = settings.clone();
        invalid.log_level = "loud".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.token.expiry_ms = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.token.sweep_interval_ms = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.token.token_bytes = 8;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.lockout.max_failed_attempts = 5;
        invalid.lockout.lockout_secs = 0;
        assert!(invalid.validate().is_err());

        // lockout disabled, so a zero duration is fine
        let mut valid = settings.clone();
        valid.lockout.lockout_secs = 0;
        assert!(valid.validate().is_ok());

        let mut invalid = settings;
        invalid.hasher.scrypt_r = 0;
        assert!(matches!(invalid.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_load_settings_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "authsvc.toml",
                r#"
                log_level = "debug"
                revoke_tokens_on_user_delete = true

                [token]
                expiry_ms = 3000

                [hasher]
                algorithm = "argon2"
                "#,
            )?;
            jail.set_env("AUTHSVC_LOG_LEVEL", "warn");
            jail.set_env("AUTHSVC_LOCKOUT__MAX_FAILED_ATTEMPTS", "3");

            let settings = Settings::load().expect("settings should load");
            // Environment variable takes precedence
            assert_eq!(settings.log_level, "warn");
            assert_eq!(settings.token.expiry_ms, 3000);
            // Untouched keys keep their defaults
            assert_eq!(settings.token.sweep_interval_ms, TWO_HOURS_MS);
            assert_eq!(settings.hasher.algorithm, HashAlgorithm::Argon2);
            assert_eq!(settings.lockout.max_failed_attempts, 3);
            assert!(settings.revoke_tokens_on_user_delete);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load_from("does-not-exist.toml").expect("defaults");
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[token]\nexpiry_ms = 0\n")?;
            assert!(Settings::load_from("bad.toml").is_err());
            Ok(())
        });
    }
}
