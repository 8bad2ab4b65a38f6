// ============================================================================
// MODÈLE : COMPLAINTS
// ============================================================================
//
// Colonnes de la table complaints:
//   - id (INTEGER, PRIMARY KEY, SERIAL) - identifiant interne
//   - complaint_id (INTEGER, UNIQUE) - identifiant public à 4 chiffres
//   - name, user_email, phone : demandeur
//   - complaint_type, complaint_sub_type, location, company_address
//   - title, description
//   - status (VARCHAR(16)) - pending | in_progress | resolved | rejected
//   - attachments (JSON) - liste des pièces jointes hébergées
//   - assigned_to, assigned_to_email, engineer_message, resolution_message
//   - created_at, updated_at
//
// Points d'attention:
//   - Les routes identifient une plainte uniquement par complaint_id
//   - Aucune machine à états : n'importe quel statut peut en remplacer un autre
//   - Les comptes sont référencés par nom/email, sans clé étrangère
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "complaints")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_serializing)]
    pub id: i32,

    #[sea_orm(unique)]
    pub complaint_id: i32,

    pub name: String,
    pub user_email: String,
    pub phone: String,

    pub complaint_type: String,
    pub complaint_sub_type: Option<String>,
    pub location: String,
    pub company_address: String,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub status: ComplaintStatus,

    #[sea_orm(column_type = "Json")]
    pub attachments: Attachments,

    pub assigned_to: String,
    pub assigned_to_email: String,
    #[sea_orm(column_type = "Text")]
    pub engineer_message: String,
    #[sea_orm(column_type = "Text")]
    pub resolution_message: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[sea_orm(string_value = "pending")]
    #[serde(alias = "Pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    #[serde(alias = "In Progress", alias = "in progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    #[serde(alias = "Resolved")]
    Resolved,
    #[sea_orm(string_value = "rejected")]
    #[serde(alias = "Rejected")]
    Rejected,
}

impl ComplaintStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "Pending",
            ComplaintStatus::InProgress => "In Progress",
            ComplaintStatus::Resolved => "Resolved",
            ComplaintStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    // Accepte les variantes vues côté frontend : "in_progress", "In Progress", "resolve"...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" => Ok(ComplaintStatus::Pending),
            "in_progress" => Ok(ComplaintStatus::InProgress),
            "resolved" | "resolve" => Ok(ComplaintStatus::Resolved),
            "rejected" | "reject" => Ok(ComplaintStatus::Rejected),
            _ => Err(format!("Invalid status value: {}", s)),
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pièce jointe hébergée, créée depuis la réponse de l'asset host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Attachments(pub Vec<Attachment>);
