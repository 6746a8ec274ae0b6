//! Process-wide configuration, loaded once at start.
//!
//! # Invariants
//! - The signing secret is never empty.
//! - Values are passed explicitly to the components that need them; nothing
//!   here is global state.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

pub const ENV_JWT_SECRET: &str = "TASKAUTH_JWT_SECRET";
pub const ENV_HASH_COST: &str = "TASKAUTH_HASH_COST";
pub const ENV_HASH_MEMORY_KIB: &str = "TASKAUTH_HASH_MEMORY_KIB";
pub const ENV_DB_PATH: &str = "TASKAUTH_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKAUTH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKAUTH_LOG_DIR";
pub const ENV_MAINTENANCE: &str = "TASKAUTH_MAINTENANCE";

pub const DEFAULT_HASH_COST: u32 = 2;
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
pub const DEFAULT_DB_PATH: &str = "taskauth.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "required environment variable `{var}` is not set"),
            Self::Invalid { var, reason } => write!(f, "invalid value for `{var}`: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Secrets and cost factors consumed by the token issuer and credential hasher.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// HMAC key for session tokens.
    pub signing_secret: String,
    /// Argon2 iteration count.
    pub hash_cost: u32,
    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,
}

impl AuthConfig {
    /// Builds auth settings with default cost factors; rejects a blank secret.
    pub fn new(signing_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let signing_secret = signing_secret.into();
        if signing_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: ENV_JWT_SECRET,
                reason: "secret cannot be empty".to_string(),
            });
        }
        Ok(Self {
            signing_secret,
            hash_cost: DEFAULT_HASH_COST,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
        })
    }

    /// Overrides the Argon2 iteration count and memory cost.
    pub fn with_hash_cost(mut self, hash_cost: u32, hash_memory_kib: u32) -> Self {
        self.hash_cost = hash_cost;
        self.hash_memory_kib = hash_memory_kib;
        self
    }
}

impl Debug for AuthConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("hash_cost", &self.hash_cost)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .finish()
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// When set, every handler answers 503 before touching the store.
    pub maintenance: bool,
}

impl AppConfig {
    /// Loads configuration from `TASKAUTH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup(ENV_JWT_SECRET).ok_or(ConfigError::Missing(ENV_JWT_SECRET))?;
        let hash_cost = parse_u32(&lookup, ENV_HASH_COST, DEFAULT_HASH_COST)?;
        let hash_memory_kib = parse_u32(&lookup, ENV_HASH_MEMORY_KIB, DEFAULT_HASH_MEMORY_KIB)?;
        let auth = AuthConfig::new(secret)?.with_hash_cost(hash_cost, hash_memory_kib);

        let log_dir = lookup(ENV_LOG_DIR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        if let Some(dir) = &log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    var: ENV_LOG_DIR,
                    reason: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }

        let maintenance = match lookup(ENV_MAINTENANCE) {
            None => false,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "" | "0" | "false" | "off" => false,
                "1" | "true" | "on" => true,
                other => {
                    return Err(ConfigError::Invalid {
                        var: ENV_MAINTENANCE,
                        reason: format!("expected true|false, got `{other}`"),
                    })
                }
            },
        };

        Ok(Self {
            auth,
            db_path: lookup(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            log_level: lookup(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir,
            maintenance,
        })
    }
}

fn parse_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|parsed| *parsed > 0)
            .ok_or_else(|| ConfigError::Invalid {
                var,
                reason: format!("expected a positive integer, got `{value}`"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_HASH_COST, ENV_JWT_SECRET};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn secret_is_required() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_JWT_SECRET));

        let err = AppConfig::from_lookup(lookup_from(&[(ENV_JWT_SECRET, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = AppConfig::from_lookup(lookup_from(&[(ENV_JWT_SECRET, "s3cret")])).unwrap();
        assert_eq!(config.auth.hash_cost, DEFAULT_HASH_COST);
        assert!(!config.maintenance);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn invalid_numbers_and_relative_log_dir_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            (ENV_JWT_SECRET, "s3cret"),
            ("TASKAUTH_HASH_COST", "zero"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TASKAUTH_HASH_COST"));

        let err = AppConfig::from_lookup(lookup_from(&[
            (ENV_JWT_SECRET, "s3cret"),
            ("TASKAUTH_LOG_DIR", "logs"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn maintenance_flag_parses() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_JWT_SECRET, "s3cret"),
            ("TASKAUTH_MAINTENANCE", "TRUE"),
        ]))
        .unwrap();
        assert!(config.maintenance);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = AppConfig::from_lookup(lookup_from(&[(ENV_JWT_SECRET, "s3cret")])).unwrap();
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}
