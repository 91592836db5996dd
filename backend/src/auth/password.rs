//! Password hashing
//!
//! New hashes are Argon2id PHC strings. Verification also accepts bcrypt
//! hashes (`$2a$`, `$2b$`, `$2y$`) carried over from older records.
//!
//! Both algorithms are CPU-bound; async callers use the `_async` variants,
//! which run on the blocking pool.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

/// Secret behind the stand-in hash used for unknown accounts
const UNKNOWN_ACCOUNT_SECRET: &str = "taskboard-unknown-account";

/// Password hashing service
pub struct PasswordService;

impl PasswordService {
    /// Hash a password with a fresh salt (blocking operation)
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        if Self::is_legacy_bcrypt(hash) {
            return bcrypt::verify(password, hash)
                .map_err(|e| anyhow::anyhow!("Invalid bcrypt hash: {}", e));
        }

        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub async fn verify_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify against a stand-in hash so an unknown account costs as much as
    /// a wrong password. Never succeeds.
    pub fn verify_unknown(password: &str) -> Result<bool> {
        static STAND_IN: OnceLock<String> = OnceLock::new();
        let hash = match STAND_IN.get() {
            Some(hash) => hash,
            None => {
                let hash = Self::hash(UNKNOWN_ACCOUNT_SECRET)?;
                STAND_IN.get_or_init(|| hash)
            }
        };
        Self::verify(password, hash)?;
        Ok(false)
    }

    pub async fn verify_unknown_async(password: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify_unknown(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    fn is_legacy_bcrypt(hash: &str) -> bool {
        ["$2a$", "$2b$", "$2y$"].iter().any(|p| hash.starts_with(p))
    }
}
