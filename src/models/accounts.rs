// ============================================================================
// MODÈLE : ACCOUNTS
// ============================================================================
//
// Description:
//   Les quatre collections de comptes (admin, manager, engineer, user) dans
//   une seule table partitionnée par la colonne `role`.
//
// Colonnes de la table accounts:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - role (VARCHAR(16), NOT NULL) - admin | manager | engineer | user
//   - name, email, phone (VARCHAR, NOT NULL)
//   - password_hash (VARCHAR, NOT NULL) - pbkdf2:sha256:iterations$salt$hash
//   - previous_password_hash (VARCHAR, NULL)
//   - otp_hash, otp_expires_at, otp_sent_at (NULL hors challenge OTP)
//   - otp_verified, otp_required (BOOLEAN, NOT NULL)
//   - reset_token_hash, reset_token_expires_at (NULL hors reset)
//   - created_at, updated_at (TIMESTAMP)
//
// Points d'attention:
//   - Index UNIQUE (role, email) et (role, phone), créés par db::create_schema
//   - Les champs OTP sont vidés après une vérification réussie
//   - Le token de reset n'est jamais stocké en clair (digest SHA-256)
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub role: Role,

    pub name: String,

    pub email: String,

    pub phone: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    #[serde(skip_serializing)]
    pub previous_password_hash: Option<String>,

    #[serde(skip_serializing)]
    pub otp_hash: Option<String>,

    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTimeUtc>,

    #[serde(skip_serializing)]
    pub otp_sent_at: Option<DateTimeUtc>,

    pub otp_verified: bool,

    pub otp_required: bool,

    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,

    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Rôle d'un compte : sélectionne la collection et le dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "engineer")]
    Engineer,
    #[sea_orm(string_value = "user")]
    User,
}

impl Role {
    pub const STAFF: [Role; 3] = [Role::Admin, Role::Manager, Role::Engineer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Engineer => "engineer",
            Role::User => "user",
        }
    }

    pub fn is_staff(&self) -> bool {
        Role::STAFF.contains(self)
    }

    /// Rôle optionnel venant d'un formulaire : absent ou vide = collection user
    pub fn from_optional(raw: Option<&str>) -> Result<Role, UnknownRole> {
        match raw.map(str::trim).filter(|r| !r.is_empty()) {
            None => Ok(Role::User),
            Some(r) => r.parse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role '{0}'. Valid roles are: admin, manager, engineer, user.")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "engineer" => Ok(Role::Engineer),
            "user" => Ok(Role::User),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::from_optional(None).unwrap(), Role::User);
        assert_eq!(Role::from_optional(Some("  ")).unwrap(), Role::User);
        assert_eq!(Role::from_optional(Some("ENGINEER")).unwrap(), Role::Engineer);
        assert!(Role::from_optional(Some("root")).is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        assert!(Role::Manager.is_staff());
        assert!(!Role::User.is_staff());
    }
}
