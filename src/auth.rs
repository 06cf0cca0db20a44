use argon2::{
    Argon2,
    PasswordHash,
    PasswordVerifier,
    PasswordHasher,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use argon2::password_hash::{SaltString, rand_core::OsRng as PHOsRng};

/// Verify password using the Argon2 hash stored in DB.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash a new password using Argon2id with a random salt.
/// Store the returned string in app_user.password_hash.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut PHOsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| format!("argon2 hash error: {e}"))
}

/// Account passwords must be at least 8 characters and mix upper case,
/// lower case, digits and a special character.
pub fn password_meets_complexity(password: &str) -> bool {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace());

    password.len() >= 8 && has_upper && has_lower && has_digit && has_special
}

/// Generate an opaque session token to return to the client.
/// We store only a hash(token) in DB for safety.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash token for DB storage (SHA-256 hex).
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_complexity() {
        assert!(password_meets_complexity("Sup3r$ecret"));
        assert!(password_meets_complexity("Aa1!Aa1!"));

        assert!(!password_meets_complexity("Aa1!Aa1")); // too short
        assert!(!password_meets_complexity("alllowercase1!")); // no upper
        assert!(!password_meets_complexity("ALLUPPERCASE1!")); // no lower
        assert!(!password_meets_complexity("NoDigitsHere!")); // no digit
        assert!(!password_meets_complexity("NoSpecials123")); // no special
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("Sup3r$ecret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Sup3r$ecret", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_access_token_hash_is_stable_hex() {
        let token = "fixed-token";
        let a = hash_access_token(token);
        let b = hash_access_token(token);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, hash_access_token("other-token"));
    }
}
