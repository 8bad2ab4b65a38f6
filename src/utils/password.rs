use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

// Les tests tournent en debug : on garde le même format avec moins d'itérations
const ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 260_000 };
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid hash format: {0}")]
    InvalidFormat(&'static str),

    #[error("key derivation failed")]
    Derivation,
}

/// Hash un secret (mot de passe ou code OTP) au format Werkzeug
/// `pbkdf2:sha256:iterations$salt$hash`, salt de 16 bytes, base64 URL-safe sans padding
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, ITERATIONS, &mut key)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(format!(
        "pbkdf2:sha256:{}${}${}",
        ITERATIONS,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un secret contre un hash produit par `hash_password`
/// Le nombre d'itérations est relu depuis le hash stocké
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let mut parts = stored_hash.split('$');
    let (Some(header), Some(salt_str), Some(hash_str), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PasswordError::InvalidFormat("expected 3 '$'-separated parts"));
    };

    let iterations = match header.split(':').collect::<Vec<_>>().as_slice() {
        ["pbkdf2", "sha256", iterations] => iterations
            .parse::<u32>()
            .map_err(|_| PasswordError::InvalidFormat("iterations"))?,
        _ => return Err(PasswordError::InvalidFormat("header")),
    };

    let salt = URL_SAFE_NO_PAD
        .decode(salt_str)
        .map_err(|_| PasswordError::InvalidFormat("salt"))?;
    let expected = URL_SAFE_NO_PAD
        .decode(hash_str)
        .map_err(|_| PasswordError::InvalidFormat("hash"))?;

    let mut computed = vec![0u8; expected.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(constant_time_eq(&computed, &expected))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
