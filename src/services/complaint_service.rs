use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;

use super::complaint_form::ComplaintDraft;
use super::mailer::{Mailer, OutgoingEmail};
use super::notifications;
use crate::error::{ServiceError, ServiceResult};
use crate::models::complaints::{self, Attachment, Attachments, ComplaintStatus};
use crate::models::dto::AssignRequest;

pub const COMPLAINT_ID_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;
const MAX_ID_ATTEMPTS: usize = 10;
const LIST_LIMIT: u64 = 100;

/// Filtres de listing ; `None` = pas de filtre
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub user_email: Option<String>,
    pub status: Option<ComplaintStatus>,
    pub complaint_type: Option<String>,
    pub assigned_to_email: Option<String>,
}

/// Comment retrouver les plaintes d'un ingénieur
#[derive(Debug, Clone)]
pub enum EngineerLookup {
    Email(String),
    Name(String),
}

/// Plainte modifiée + avertissement si la notification a échoué
#[derive(Debug)]
pub struct Updated {
    pub complaint: complaints::Model,
    pub warning: Option<String>,
}

pub struct ComplaintService;

impl ComplaintService {
    pub fn random_complaint_id() -> i32 {
        rand::thread_rng().gen_range(COMPLAINT_ID_RANGE)
    }

    /// Tire des candidats via `next` jusqu'à en trouver un libre (10 essais max)
    pub async fn generate_complaint_id<F>(db: &DatabaseConnection, mut next: F) -> ServiceResult<i32>
    where
        F: FnMut() -> i32,
    {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = next();
            let exists = complaints::Entity::find()
                .filter(complaints::Column::ComplaintId.eq(candidate))
                .count(db)
                .await?
                > 0;

            if !exists {
                return Ok(candidate);
            }
        }

        tracing::error!(attempts = MAX_ID_ATTEMPTS, "complaint id space exhausted");
        Err(ServiceError::IdSpaceExhausted)
    }

    /// Persiste une plainte validée, statut pending et assignation vide
    pub async fn create(
        db: &DatabaseConnection,
        draft: ComplaintDraft,
        attachments: Vec<Attachment>,
    ) -> ServiceResult<complaints::Model> {
        let complaint_id = Self::generate_complaint_id(db, Self::random_complaint_id).await?;
        let now = Utc::now();

        let complaint = complaints::ActiveModel {
            complaint_id: Set(complaint_id),
            name: Set(draft.name),
            user_email: Set(draft.user_email),
            phone: Set(draft.phone),
            complaint_type: Set(draft.complaint_type),
            complaint_sub_type: Set(draft.complaint_sub_type),
            location: Set(draft.location),
            company_address: Set(draft.company_address),
            title: Set(draft.title),
            description: Set(draft.description),
            status: Set(ComplaintStatus::Pending),
            attachments: Set(Attachments(attachments)),
            assigned_to: Set(String::new()),
            assigned_to_email: Set(String::new()),
            engineer_message: Set(String::new()),
            resolution_message: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(
            complaint_id = complaint.complaint_id,
            attachments = complaint.attachments.0.len(),
            "complaint created"
        );
        Ok(complaint)
    }

    /// Plus récentes d'abord, 100 résultats max
    pub async fn list(db: &DatabaseConnection, filter: &ComplaintFilter) -> ServiceResult<Vec<complaints::Model>> {
        let mut query = complaints::Entity::find();

        if let Some(email) = &filter.user_email {
            query = query.filter(complaints::Column::UserEmail.eq(email.to_lowercase()));
        }
        if let Some(status) = filter.status {
            query = query.filter(complaints::Column::Status.eq(status));
        }
        if let Some(complaint_type) = &filter.complaint_type {
            query = query.filter(complaints::Column::ComplaintType.eq(complaint_type.as_str()));
        }
        if let Some(assignee) = &filter.assigned_to_email {
            query = query.filter(complaints::Column::AssignedToEmail.eq(assignee.to_lowercase()));
        }

        Ok(query
            .order_by_desc(complaints::Column::CreatedAt)
            .limit(LIST_LIMIT)
            .all(db)
            .await?)
    }

    pub async fn list_for_engineer(
        db: &DatabaseConnection,
        lookup: &EngineerLookup,
    ) -> ServiceResult<Vec<complaints::Model>> {
        let query = match lookup {
            EngineerLookup::Email(email) => {
                complaints::Entity::find().filter(complaints::Column::AssignedToEmail.eq(email.to_lowercase()))
            }
            // comparaison insensible à la casse sur le nom
            EngineerLookup::Name(name) => complaints::Entity::find().filter(
                Expr::expr(Func::lower(Expr::col(complaints::Column::AssignedTo))).eq(name.trim().to_lowercase()),
            ),
        };

        Ok(query
            .order_by_desc(complaints::Column::CreatedAt)
            .limit(LIST_LIMIT)
            .all(db)
            .await?)
    }

    pub async fn find_by_complaint_id(db: &DatabaseConnection, complaint_id: i32) -> ServiceResult<complaints::Model> {
        complaints::Entity::find()
            .filter(complaints::Column::ComplaintId.eq(complaint_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Complaint not found".to_string()))
    }

    /// Assigne un ingénieur (admin) : statut in_progress + email à l'ingénieur
    pub async fn assign(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        complaint_id: i32,
        request: AssignRequest,
    ) -> ServiceResult<Updated> {
        let assigned_to = request.assigned_to.trim().to_string();
        let assigned_to_email = request.assigned_to_email.trim().to_lowercase();

        let mut errors = Vec::new();
        if assigned_to.is_empty() {
            errors.push("assignedTo is required".to_string());
        }
        if assigned_to_email.is_empty() {
            errors.push("assignedToEmail is required".to_string());
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let complaint = Self::find_by_complaint_id(db, complaint_id).await?;
        let mut active: complaints::ActiveModel = complaint.into();
        active.assigned_to = Set(assigned_to);
        active.assigned_to_email = Set(assigned_to_email);
        active.status = Set(ComplaintStatus::InProgress);
        active.updated_at = Set(Utc::now());
        let complaint = active.update(db).await?;

        tracing::info!(complaint_id, engineer = %complaint.assigned_to_email, "complaint assigned");

        let warning = notify(mailer, notifications::complaint_assigned(&complaint)).await;
        Ok(Updated { complaint, warning })
    }

    /// Résolution / rejet (ingénieur) : message obligatoire, email au demandeur
    pub async fn resolve_or_reject(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        complaint_id: i32,
        status: ComplaintStatus,
        message: &str,
    ) -> ServiceResult<Updated> {
        if !matches!(status, ComplaintStatus::Resolved | ComplaintStatus::Rejected) {
            return Err(ServiceError::validation("Status must be either 'resolved' or 'rejected'"));
        }

        let message = message.trim();
        if message.is_empty() {
            return Err(ServiceError::validation("Engineer message is required"));
        }

        let complaint = Self::find_by_complaint_id(db, complaint_id).await?;
        let mut active: complaints::ActiveModel = complaint.into();
        active.status = Set(status);
        active.engineer_message = Set(message.to_string());
        active.resolution_message = Set(message.to_string());
        active.updated_at = Set(Utc::now());
        let complaint = active.update(db).await?;

        tracing::info!(complaint_id, status = %status, "complaint closed by engineer");

        let warning = notify(mailer, notifications::complaint_closed(&complaint)).await;
        Ok(Updated { complaint, warning })
    }

    /// Écrase le statut (admin/manager), sans notification
    pub async fn update_status(
        db: &DatabaseConnection,
        complaint_id: i32,
        status: ComplaintStatus,
    ) -> ServiceResult<complaints::Model> {
        let complaint = Self::find_by_complaint_id(db, complaint_id).await?;
        let mut active: complaints::ActiveModel = complaint.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let complaint = active.update(db).await?;

        tracing::info!(complaint_id, status = %status, "complaint status updated");
        Ok(complaint)
    }
}

// la mutation est déjà persistée : un échec d'envoi devient un avertissement
async fn notify(mailer: &dyn Mailer, email: OutgoingEmail) -> Option<String> {
    let to = email.to.clone();
    match mailer.send(email).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(to = %to, error = %e, "notification email failed");
            Some("Status updated but the notification email could not be sent".to_string())
        }
    }
}
