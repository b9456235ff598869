//! Credential hashing for instructor/student passwords.

use crate::model::validation::{ValidationError, MIN_PASSWORD_CHARS};
use sha2::{Digest, Sha256};

/// Attribute holding the stored credential hash.
pub const PASSWORD_FIELD: &str = "password";

/// Hashes a plaintext password into the stored lowercase-hex SHA-256 form.
///
/// # Errors
/// - `PasswordTooShort` when the plaintext has fewer than 6 characters.
pub fn hash_password(plaintext: &str) -> Result<String, ValidationError> {
    if plaintext.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_CHARS,
        });
    }
    Ok(hex::encode(Sha256::digest(plaintext.as_bytes())))
}

/// Checks a plaintext password against a stored hash.
///
/// Digests are compared in constant time; a malformed stored hash never
/// verifies.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let Ok(stored) = blake3::Hash::from_hex(stored_hash.trim()) else {
        return false;
    };
    let digest: [u8; 32] = Sha256::digest(plaintext.as_bytes()).into();
    // `blake3::Hash` equality is constant time.
    blake3::Hash::from(digest) == stored
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};

    #[test]
    fn hash_is_hex_sha256() {
        let hash = hash_password("secret1").unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("secret1", ""));
        assert!(!verify_password("secret1", "not-hex"));
        let hash = hash_password("secret1").unwrap();
        assert!(!verify_password("secret1", &hash[..62]));
        assert!(verify_password("secret1", &hash.to_uppercase()));
    }

    #[test]
    fn short_plaintext_is_rejected() {
        assert!(hash_password("12345").is_err());
    }
}
