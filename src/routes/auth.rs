use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::{HttpResponse, get, post, web};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::config::Settings;
use crate::error::ServiceError;
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::models::dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest, SendOtpRequest,
};
use crate::services::account_service::AccountService;
use crate::services::auth_service::{AuthService, parse_role};
use crate::services::mailer::Mailer;

/// POST /api/auth/login - Se connecter (PUBLIC)
/// Répond OTP_REQUIRED tant que le second facteur n'est pas fourni
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    let identity = AuthService::authorize(db.get_ref(), mailer.get_ref(), &settings.auth, body.into_inner()).await?;
    let token = AuthService::session_token(&identity, &settings.auth)?;

    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(settings.auth.session_ttl_hours))
        .finish();

    tracing::info!(email = %identity.email, role = %identity.role, "login succeeded");

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        success: true,
        token,
        user: identity,
    }))
}

/// GET /api/auth/me - Identité de la session (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "user": auth_user.identity()
    }))
}

/// POST /api/auth/send-otp - (Ré)émet un code et active l'OTP sur le compte (PUBLIC)
#[post("/send-otp")]
pub async fn send_otp(
    body: web::Json<SendOtpRequest>,
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    let retry_after = AuthService::send_otp(db.get_ref(), mailer.get_ref(), &settings.auth, body.into_inner()).await?;

    if let Some(retry_after) = retry_after {
        return Ok(HttpResponse::TooManyRequests().json(json!({
            "success": false,
            "error": "OTP already sent. Please wait before requesting a new one.",
            "retryAfter": retry_after
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "OTP sent to email"
    })))
}

/// POST /api/auth/forgot-password - Envoie un lien de reset (PUBLIC)
#[post("/forgot-password")]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordRequest>,
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    let role = parse_role(body.role.as_deref())?;
    AccountService::forgot_password(db.get_ref(), mailer.get_ref(), &settings, role, &body.email).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password reset email sent"
    })))
}

/// POST /api/auth/reset-password/{token} - Nouveau mot de passe depuis le lien (PUBLIC)
#[post("/reset-password/{token}")]
pub async fn reset_password(
    path: web::Path<String>,
    body: web::Json<ResetPasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    AccountService::reset_password(db.get_ref(), &path.into_inner(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password reset successful"
    })))
}

/// POST /api/auth/change-password - Changer son mot de passe (PROTÉGÉE)
#[post("/change-password")]
pub async fn change_password(
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    AccountService::change_password(db.get_ref(), auth_user.id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password changed successfully"
    })))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(login)
            .service(me)
            .service(send_otp)
            .service(forgot_password)
            .service(reset_password)
            .service(change_password),
    );
}
