use std::sync::Mutex;

use argon2::{
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::error;

use crate::{config::HashConfig, error::AccountError};

/// One-way hashing of stored credentials.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, AccountError>;
    fn verify(&self, hash: &str, plain: &str) -> Result<bool, AccountError>;
}

/// Argon2id with a per-call random salt drawn from an owned RNG.
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    rng: Mutex<StdRng>,
}

impl Argon2Hasher {
    pub fn new(cfg: &HashConfig, rng: StdRng) -> Result<Self, AccountError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            rng: Mutex::new(rng),
        })
    }

    pub fn from_entropy(cfg: &HashConfig) -> Result<Self, AccountError> {
        Self::new(cfg, StdRng::from_entropy())
    }

    fn salt(&self) -> SaltString {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        SaltString::generate(&mut *rng)
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, AccountError> {
        let salt = self.salt();
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AccountError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    // Cost parameters are read from the stored hash, so older hashes keep verifying.
    fn verify(&self, hash: &str, plain: &str) -> Result<bool, AccountError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AccountError::Hashing(e.to_string())
        })?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(AccountError::Hashing(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher(seed: u64) -> Argon2Hasher {
    let cfg = HashConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };
    Argon2Hasher::new(&cfg, StdRng::seed_from_u64(seed)).expect("valid test params")
}
