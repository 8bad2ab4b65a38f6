use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::accounts::Role;
use crate::models::dto::Identity;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: i64, // expiration timestamp
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to calculate expiration")]
    Expiration,

    #[error("failed to generate token: {0}")]
    Encode(jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// Génère un JWT de session pour une identité vérifiée
pub fn generate_token(identity: &Identity, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(TokenError::Expiration)?
        .timestamp();

    let claims = Claims {
        sub: identity.id.to_string(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        role: identity.role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Encode)
}

/// Vérifie et décode un JWT de session
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(TokenError::Invalid)
}
