use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use color_eyre::{Result, eyre::eyre};
use password_hash::{PasswordHash, SaltString};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password into an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| eyre!("Failed to generate salt: {e}"))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| eyre!("Failed to encode salt: {e}"))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre!("Failed to hash password: {e}"))?
        .to_string();
    Ok(phc)
}

/// An unparseable hash never verifies.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hash of a random secret nobody knows. Verifying against it costs the same
/// as verifying a real admin's hash.
pub fn dummy_hash() -> Result<String> {
    let mut secret = [0u8; 32];
    getrandom::getrandom(&mut secret).map_err(|e| eyre!("Failed to generate dummy secret: {e}"))?;
    let secret: String = secret.iter().map(|b| format!("{b:02x}")).collect();
    hash_password(&secret)
}
