use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures::future::{Ready, ready};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::ServiceError;
use crate::models::accounts::Role;
use crate::models::dto::Identity;
use crate::utils::jwt;

/// Nom du cookie HttpOnly posé au login
pub const SESSION_COOKIE: &str = "session";

/// Compte authentifié, extrait du JWT de session
/// Utilisé comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    /// 403 si le rôle de la session n'est pas dans `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ServiceError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            tracing::info!(email = %self.email, role = %self.role, "access denied for role");
            Err(ServiceError::Forbidden("You are not allowed to perform this action".to_string()))
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

// Header "Authorization: Bearer <token>" en priorité, sinon le cookie de session
fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        return header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());
    }

    req.cookie(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ServiceError> {
    let settings = req
        .app_data::<web::Data<Settings>>()
        .ok_or_else(|| ServiceError::Internal("settings are not registered".to_string()))?;

    let token = session_token(req)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let claims = jwt::verify_token(&token, &settings.auth.jwt_secret)
        .map_err(|_| ServiceError::Unauthorized("Invalid or expired session".to_string()))?;

    let id = claims
        .sub
        .parse()
        .map_err(|_| ServiceError::Unauthorized("Invalid or expired session".to_string()))?;

    Ok(AuthUser {
        id,
        email: claims.email,
        name: claims.name,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
