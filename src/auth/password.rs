//! Password hashing and verification using Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Hash a plaintext password with Argon2id and a fresh random salt,
/// returning a PHC-formatted string safe for storage.
///
/// Complexity rules are enforced at the input-shaping layer before the
/// plaintext reaches this function.
pub fn hash(plaintext: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| AuthError::HashingFailure(e.to_string()))?
        .to_string();

    Ok(hash)
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Mismatch is `Ok(false)`, never an error; only a malformed stored hash
/// fails. Comparison timing is handled by the argon2 verifier.
pub fn verify(stored_hash: &str, plaintext: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::CorruptHash(e.to_string()))?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::CorruptHash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash("Abcd1234!").expect("hashing should succeed");
        assert!(verify(&hash, "Abcd1234!").unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let hash = hash("Abcd1234!").expect("hashing should succeed");
        assert!(!verify(&hash, "Wrong1234!").unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_error() {
        let err = verify("not-a-phc-string", "Abcd1234!").unwrap_err();
        assert!(matches!(err, AuthError::CorruptHash(_)));
    }

    #[test]
    fn test_salts_differ() {
        let h1 = hash("Abcd1234!").unwrap();
        let h2 = hash("Abcd1234!").unwrap();
        assert_ne!(h1, h2);
    }
}
