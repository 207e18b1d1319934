//! Password hashing
//!
//! Stored credentials have the form `<argon2 PHC string>:<base64 salt>`. The
//! extra 16-byte salt is appended to the password (truncated to 72 bytes)
//! before hashing, so stored values stay compatible with older records.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use drip_common::{Error, Result};
use std::sync::OnceLock;

/// Longest password prefix that takes part in the hash
pub const MAX_PASSWORD_BYTES: usize = 72;

const SALT_LEN: usize = 16;

static ABSENT_CREDENTIAL: OnceLock<String> = OnceLock::new();

fn hash_input(password: &str, salt: &str) -> Vec<u8> {
    let bytes = password.as_bytes();
    let mut input = bytes[..bytes.len().min(MAX_PASSWORD_BYTES)].to_vec();
    input.extend_from_slice(salt.as_bytes());
    input
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = STANDARD.encode(salt_bytes);

    let input = hash_input(password, &salt);
    let phc_salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(&input, &phc_salt)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(format!("{}:{}", phc, salt))
}

/// Check a password against a stored credential
///
/// Malformed stored values never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split(':').collect();
    let [phc, salt] = parts.as_slice() else {
        return false;
    };

    PasswordHash::new(phc)
        .ok()
        .and_then(|parsed| {
            Argon2::default()
                .verify_password(&hash_input(password, salt), &parsed)
                .ok()
        })
        .is_some()
}

/// Run a full verification against a credential no account owns
///
/// Login calls this when no account matches, so an unknown email costs as
/// much as a wrong password. Always returns false.
pub fn verify_absent(password: &str) -> bool {
    let stored = ABSENT_CREDENTIAL
        .get_or_init(|| hash_password("absent-account").unwrap_or_default());
    verify_password(password, stored);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_absent() {
        assert!(!verify_absent("absent-account"));
        assert!(!verify_absent("anything"));

        let stored = ABSENT_CREDENTIAL.get().unwrap();
        let (phc, _) = stored.split_once(':').unwrap();
        assert!(PasswordHash::new(phc).is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("password").unwrap();
        let second = hash_password("password").unwrap();
        assert_ne!(first, second);
        assert_eq!(first.split(':').count(), 2);
    }

    #[test]
    fn test_truncates_long_passwords() {
        let long = "a".repeat(100);
        let stored = hash_password(&long).unwrap();

        assert!(verify_password(&long, &stored));
        assert!(verify_password(&"a".repeat(72), &stored));
        assert!(!verify_password(&"a".repeat(71), &stored));
    }

    #[test]
    fn test_malformed_hash_does_not_verify() {
        assert!(!verify_password("password", "no-separator"));
        assert!(!verify_password("password", "a:b:c"));
        assert!(!verify_password("password", "not-a-phc:c2FsdA=="));
        assert!(!verify_password("password", ""));
    }
}
