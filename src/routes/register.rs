// Inscription : collection user (/register) et comptes staff (/admin, /manager, /engineer)

use actix_web::{HttpResponse, post, web};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::config::Settings;
use crate::error::{ServiceError, ServiceResult};
use crate::models::accounts::{Role, UnknownRole};
use crate::models::dto::{Identity, RegisterRequest, VerifyOtpRequest};
use crate::services::account_service::AccountService;
use crate::services::mailer::Mailer;

fn created(identity: Identity) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully",
        "user": identity
    }))
}

/// Rôle staff optionnel du body : absent = admin, `user` refusé
fn staff_role(raw: Option<&str>) -> ServiceResult<Role> {
    let role = match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::Admin,
        Some(r) => r.parse().map_err(|e: UnknownRole| ServiceError::validation(e.to_string()))?,
    };

    if role.is_staff() {
        Ok(role)
    } else {
        Err(ServiceError::validation("Role must be one of: admin, manager, engineer"))
    }
}

async fn register_as(db: &DatabaseConnection, role: Role, body: RegisterRequest) -> Result<HttpResponse, ServiceError> {
    let identity = AccountService::register(db, role, body).await?;
    Ok(created(identity))
}

async fn request_otp(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    settings: &Settings,
    role: Role,
    body: RegisterRequest,
) -> Result<HttpResponse, ServiceError> {
    AccountService::stage_registration(db, mailer, settings, role, body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "OTP sent to email"
    })))
}

async fn verify_otp(db: &DatabaseConnection, role: Role, body: VerifyOtpRequest) -> Result<HttpResponse, ServiceError> {
    let identity = AccountService::confirm_registration(db, role, &body.email, &body.otp).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "OTP verified, account created",
        "user": identity
    })))
}

// ---------------------------------------------------------------- users

/// POST /api/register - Inscription directe d'un user (PUBLIC)
#[post("")]
pub async fn register_user(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    register_as(db.get_ref(), Role::User, body.into_inner()).await
}

/// POST /api/register/request-otp
#[post("/request-otp")]
pub async fn user_request_otp(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    request_otp(db.get_ref(), mailer.get_ref(), &settings, Role::User, body.into_inner()).await
}

/// POST /api/register/verify-otp
#[post("/verify-otp")]
pub async fn user_verify_otp(
    body: web::Json<VerifyOtpRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    verify_otp(db.get_ref(), Role::User, body.into_inner()).await
}

// ---------------------------------------------------------------- staff

/// POST /api/admin - Inscription directe d'un admin (PUBLIC)
#[post("")]
pub async fn register_admin(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    register_as(db.get_ref(), Role::Admin, body.into_inner()).await
}

/// POST /api/admin/request-otp - admin, manager ou engineer selon `role`
#[post("/request-otp")]
pub async fn staff_request_otp(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    let role = staff_role(body.role.as_deref())?;
    request_otp(db.get_ref(), mailer.get_ref(), &settings, role, body.into_inner()).await
}

/// POST /api/admin/verify-otp
#[post("/verify-otp")]
pub async fn staff_verify_otp(
    body: web::Json<VerifyOtpRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let role = staff_role(body.role.as_deref())?;
    verify_otp(db.get_ref(), role, body.into_inner()).await
}

/// POST /api/manager
#[post("/manager")]
pub async fn register_manager(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    register_as(db.get_ref(), Role::Manager, body.into_inner()).await
}

/// POST /api/engineer
#[post("/engineer")]
pub async fn register_engineer(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    register_as(db.get_ref(), Role::Engineer, body.into_inner()).await
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/register")
            .service(register_user)
            .service(user_request_otp)
            .service(user_verify_otp),
    )
    .service(
        web::scope("/admin")
            .service(register_admin)
            .service(staff_request_otp)
            .service(staff_verify_otp),
    )
    .service(register_manager)
    .service(register_engineer);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use super::*;
    use crate::routes::configure_routes;
    use crate::test_support::{TestState, sent_code};

    fn asha() -> Value {
        json!({
            "name": "Asha Verma",
            "email": "asha@corp.in",
            "phone": "9876543210",
            "password": "secret1"
        })
    }

    #[::core::prelude::v1::test]
    fn test_staff_role() {
        assert_eq!(staff_role(None).unwrap(), Role::Admin);
        assert_eq!(staff_role(Some("Engineer")).unwrap(), Role::Engineer);
        assert!(staff_role(Some("user")).is_err());
        assert!(staff_role(Some("root")).is_err());
    }

    #[actix_web::test]
    async fn test_duplicate_registration_is_a_conflict() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let first = test::call_service(&app, test::TestRequest::post().uri("/api/register").set_json(asha()).to_request()).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = test::call_service(&app, test::TestRequest::post().uri("/api/register").set_json(asha()).to_request()).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);

        // même email côté engineer : collection différente
        let engineer = test::call_service(&app, test::TestRequest::post().uri("/api/engineer").set_json(asha()).to_request()).await;
        assert_eq!(engineer.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn test_staff_otp_registration() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let mut body = asha();
        body["role"] = json!("manager");
        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/admin/request-otp").set_json(body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let code = sent_code(&state.mailer.sent()[0]);
        let req = test::TestRequest::post()
            .uri("/api/admin/verify-otp")
            .set_json(json!({"email": "asha@corp.in", "otp": code, "role": "manager"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["role"], "manager");
    }
}
