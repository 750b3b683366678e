/// Password hashing with Argon2id
///
/// Hashes are stored in PHC string format, so the parameters used to produce a
/// hash travel with it and verification keeps working if the defaults below change.
///
/// # Parameters
///
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2
/// - **Parallelism**: 1 lane
///
/// # Example
///
/// ```
/// use yogaguru_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("namaste123")?;
/// assert!(verify_password("namaste123", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum accepted password length (in characters)
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum accepted password length (in characters)
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash could not be parsed
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a plaintext password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch. Errors are reserved for unparseable hashes
/// and internal failures.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    if parsed.salt.is_none() || parsed.hash.is_none() {
        return Err(PasswordError::InvalidHash(
            "Hash is missing its salt or output".to_string(),
        ));
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Validates a password before it is hashed
///
/// Only length is enforced: at least 6 and at most 128 characters, and not
/// made entirely of whitespace.
///
/// ```
/// use yogaguru_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("lotus1").is_ok());
/// assert!(validate_password_strength("short").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if len > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        ));
    }

    if password.trim().is_empty() {
        return Err("Password must not be blank".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("sun_salutation").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=19456"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_hash_password_uses_fresh_salt() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("downward_dog").unwrap();

        assert!(verify_password("downward_dog", &hash).unwrap());
        assert!(!verify_password("upward_dog", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(matches!(
            verify_password("password", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(matches!(
            verify_password("password", "$argon2id$invalid"),
            Err(PasswordError::InvalidHash(_))
        ));

        // a real hash with its output stripped
        let hash = hash_password("password").unwrap();
        let truncated = &hash[..hash.rfind('$').unwrap()];
        assert!(matches!(
            verify_password("password", truncated),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_verify_unicode_password() {
        let hash = hash_password("योग-ヨガ-瑜伽").unwrap();
        assert!(verify_password("योग-ヨガ-瑜伽", &hash).unwrap());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("123456").is_ok());
        assert!(validate_password_strength("lotus pose").is_ok());

        let err = validate_password_strength("12345").unwrap_err();
        assert!(err.contains("at least 6"));

        let err = validate_password_strength(&"x".repeat(129)).unwrap_err();
        assert!(err.contains("at most 128"));

        let err = validate_password_strength("       ").unwrap_err();
        assert!(err.contains("blank"));
    }

    #[test]
    fn test_validate_password_counts_characters_not_bytes() {
        // five characters, fifteen bytes
        assert!(validate_password_strength("ヨガヨガヨ").is_err());
        assert!(validate_password_strength("ヨガヨガヨガ").is_ok());
    }
}
