//! services/api/src/adapters/password.rs
//!
//! Argon2id password hashing behind the `PasswordHasher` port.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};
use learning_core::{PasswordHasher, PortError, PortResult};
use tracing::error;

#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("Failed to hash password".to_string())
            })
    }

    fn verify(&self, password: &str, hashed: &str) -> PortResult<bool> {
        let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
            error!("Failed to parse password hash: {:?}", e);
            PortError::Unexpected("Stored password hash is unreadable".to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hasher = Argon2Hasher;
        let hashed = hasher.hash("correct horse battery").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(hasher.verify("correct horse battery", &hashed).unwrap());
        assert!(!hasher.verify("correct horse staple", &hashed).unwrap());
    }

    #[test]
    fn garbage_hashes_are_errors_not_mismatches() {
        assert!(Argon2Hasher.verify("anything", "not-a-phc-string").is_err());
    }
}
