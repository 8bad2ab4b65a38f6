use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::services::asset_store::UploadError;
use crate::services::mailer::MailError;
use crate::utils::jwt::TokenError;
use crate::utils::password::PasswordError;

/// Échecs de l'authorizer : le `code` est lu par le client pour passer à l'étape OTP
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("OTP required. A code has been sent to your email.")]
    OtpRequired { retry_after: Option<i64> },

    #[error("OTP has expired. Please request a new one.")]
    OtpExpired,

    #[error("Invalid OTP.")]
    OtpInvalid,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::OtpRequired { .. } => "OTP_REQUIRED",
            AuthError::OtpExpired => "OTP_EXPIRED",
            AuthError::OtpInvalid => "OTP_INVALID",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Failed to generate unique complaint ID")]
    IdSpaceExhausted,

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![message.into()])
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Auth(_) | ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Mail(_) | ServiceError::Upload(_) => StatusCode::BAD_GATEWAY,
            ServiceError::IdSpaceExhausted
            | ServiceError::Database(_)
            | ServiceError::Password(_)
            | ServiceError::Token(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ServiceError::Validation(errors) => json!({
                "success": false,
                "errors": errors
            }),
            ServiceError::Auth(AuthError::OtpRequired { retry_after }) => json!({
                "success": false,
                "error": self.to_string(),
                "code": "OTP_REQUIRED",
                "retryAfter": retry_after
            }),
            ServiceError::Auth(auth) => json!({
                "success": false,
                "error": auth.to_string(),
                "code": auth.code()
            }),
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "request failed");
                let message = match self {
                    ServiceError::Mail(_) => "Failed to send email",
                    ServiceError::Upload(_) => "Failed to upload attachment",
                    ServiceError::IdSpaceExhausted => "Failed to generate unique complaint ID",
                    _ => "Internal server error",
                };
                json!({ "success": false, "error": message })
            }
            _ => json!({
                "success": false,
                "error": self.to_string()
            }),
        };

        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;

    async fn body_of(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_validation_lists_every_error() {
        let (status, body) = body_of(ServiceError::Validation(vec![
            "Name is required".to_string(),
            "Title is required".to_string(),
        ]))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_otp_required_is_structured() {
        let (status, body) = body_of(AuthError::OtpRequired { retry_after: None }.into()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "OTP_REQUIRED");
    }

    #[actix_web::test]
    async fn test_database_error_is_not_leaked() {
        let (status, body) = body_of(DbErr::Custom("relation accounts missing".to_string()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[actix_web::test]
    async fn test_conflict() {
        let (status, _) = body_of(ServiceError::Conflict("Email or phone already used".to_string())).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
