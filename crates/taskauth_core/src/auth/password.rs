//! Argon2id password hashing with per-record salts.

use crate::config::AuthConfig;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SALT_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashError(String);

impl Display for HashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "password hashing failed: {}", self.0)
    }
}

impl Error for HashError {}

/// One-way password hasher configured with the process cost factor.
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Builds an Argon2id hasher from the configured cost factors.
    pub fn new(config: &AuthConfig) -> Result<Self, HashError> {
        let params = Params::new(config.hash_memory_kib, config.hash_cost, 1, None)
            .map_err(|err| HashError(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Returns a PHC string embedding algorithm, cost and salt.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        getrandom::getrandom(&mut salt_bytes).map_err(|err| HashError(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|err| HashError(err.to_string()))?;
        let phc = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| HashError(err.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Constant-time comparison of `password` against a stored PHC string.
    ///
    /// Malformed hashes verify as `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
