use rand::Rng;
use sha2::{Digest, Sha256};

/// Code OTP à 6 chiffres (100000..=999999)
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Token de reset : 32 bytes aléatoires en hexadécimal (64 caractères)
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Seul le digest du token de reset est stocké en base
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
