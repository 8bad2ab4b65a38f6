//pour les requêtes et réponses structurées
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::accounts::Role;

/// Identité minimale portée par la session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: DateTime<Utc>,
}

// ---------------------------------------------------------------- auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

// ---------------------------------------------------------------- inscription

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Name must be between 3 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please use a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Option<String>,
}

impl RegisterRequest {
    /// Trim des champs, email en minuscules
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone = self.phone.trim().to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub role: Option<String>,
}

// ---------------------------------------------------------------- plaintes

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub assigned_to_email: String,
}

/// Le frontend envoie l'id tantôt en nombre, tantôt en chaîne
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ComplaintRef {
    Number(i64),
    Text(String),
}

impl ComplaintRef {
    pub fn complaint_id(&self) -> Option<i32> {
        match self {
            ComplaintRef::Number(n) => i32::try_from(*n).ok(),
            ComplaintRef::Text(s) => s.trim().parse().ok(),
        }
        .filter(|id| *id > 0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRejectRequest {
    pub id: ComplaintRef,
    pub status: String,
    #[serde(default)]
    pub engineer_message: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintListQuery {
    pub email: Option<String>,
    pub admin: Option<bool>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub complaint_type: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EngineerQuery {
    pub name: Option<String>,
}

// ---------------------------------------------------------------- validation

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("Please use a valid 10-digit phone number".into()))
    }
}

/// Aplatit les erreurs de validator en messages lisibles, triés pour être stables
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    messages.sort();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            name: "Asha Verma".to_string(),
            email: "asha@corp.in".to_string(),
            phone: "9876543210".to_string(),
            password: "secret1".to_string(),
            role: None,
        }
    }

    #[test]
    fn test_register_request_valid() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_register_request_collects_all_errors() {
        let req = RegisterRequest {
            name: "A".to_string(),
            email: "not-an-email".to_string(),
            phone: "12345".to_string(),
            password: "x".to_string(),
            role: None,
        };
        let errors = req.validate().unwrap_err();
        let messages = validation_messages(&errors);
        assert_eq!(messages.len(), 4);
        assert!(messages.contains(&"Please use a valid 10-digit phone number".to_string()));
    }

    #[test]
    fn test_normalized() {
        let mut req = request();
        req.email = "  Asha@Corp.IN ".to_string();
        assert_eq!(req.normalized().email, "asha@corp.in");
    }

    #[test]
    fn test_complaint_ref() {
        assert_eq!(ComplaintRef::Number(4821).complaint_id(), Some(4821));
        assert_eq!(ComplaintRef::Text(" 4821 ".to_string()).complaint_id(), Some(4821));
        assert_eq!(ComplaintRef::Text("abc".to_string()).complaint_id(), None);
        assert_eq!(ComplaintRef::Number(0).complaint_id(), None);
    }

    #[test]
    fn test_list_query_deserialize() {
        let query: ComplaintListQuery =
            serde_json::from_value(serde_json::json!({"admin": true, "type": "Network"})).unwrap();
        assert_eq!(query.admin, Some(true));
        assert_eq!(query.complaint_type.as_deref(), Some("Network"));
    }
}
