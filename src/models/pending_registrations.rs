// ============================================================================
// MODÈLE : PENDING REGISTRATIONS
// ============================================================================
//
// Colonnes de la table pending_registrations:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - role (VARCHAR(16)) - rôle du compte à créer
//   - name, email, phone (VARCHAR)
//   - password_hash (VARCHAR) - déjà hashé, recopié tel quel dans accounts
//   - otp_hash (VARCHAR) - code OTP hashé
//   - expires_at (TIMESTAMP) - created_at + OTP_TTL_MINUTES
//   - created_at (TIMESTAMP)
//
// Workflow:
//   1. POST /api/register/request-otp (ou /api/admin/request-otp pour le staff)
//   2. Les inscriptions en attente pour (email, role) sont supprimées
//   3. Une nouvelle ligne est insérée et le code est envoyé par email
//   4. POST .../verify-otp : code valide et non expiré -> compte créé, ligne supprimée
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::accounts::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_registrations")]
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
    pub otp_hash: String,

    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
