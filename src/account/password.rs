/// Password hashing with argon2id
use crate::error::{FmsError, FmsResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plain password into a PHC string
pub fn hash_password(password: &str) -> FmsResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| FmsError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC string
///
/// A malformed stored hash is an error; a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, stored_hash: &str) -> FmsResult<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| FmsError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
