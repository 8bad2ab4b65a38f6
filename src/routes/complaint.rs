use actix_multipart::Multipart;
use actix_web::{HttpResponse, get, patch, post, web};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::config::Settings;
use crate::error::ServiceError;
use crate::middleware::AuthUser;
use crate::models::accounts::Role;
use crate::models::complaints::ComplaintStatus;
use crate::models::dto::{AssignRequest, ComplaintListQuery, EngineerQuery, ResolveRejectRequest, StatusUpdateRequest};
use crate::services::asset_store::AssetStore;
use crate::services::complaint_form::{FileRules, validate_fields, validate_files};
use crate::services::complaint_service::{ComplaintFilter, ComplaintService, EngineerLookup, Updated};
use crate::services::mailer::Mailer;
use crate::services::uploads::{read_submission, upload_attachments};

fn parse_status(raw: &str) -> Result<ComplaintStatus, ServiceError> {
    raw.parse().map_err(ServiceError::validation)
}

fn updated_response(message: String, updated: Updated) -> HttpResponse {
    let mut body = json!({
        "success": true,
        "message": message,
        "complaint": updated.complaint
    });
    if let Some(warning) = updated.warning {
        body["warning"] = json!(warning);
    }
    HttpResponse::Ok().json(body)
}

/// POST /api/complaint - Dépôt d'une plainte en multipart (PUBLIC)
/// Champs texte validés + fichiers `files`, uploadés seulement si tout est valide
#[post("")]
pub async fn create_complaint(
    payload: Multipart,
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    store: web::Data<dyn AssetStore>,
) -> Result<HttpResponse, ServiceError> {
    let rules = FileRules::with_max_count(settings.uploads.max_files);
    let submission = read_submission(payload, &settings.uploads.temp_dir, &rules).await?;

    let (draft, mut errors) = validate_fields(&submission.fields);
    errors.extend(validate_files(&rules, &submission.files, submission.received_files));
    if !errors.is_empty() {
        tracing::info!(errors = errors.len(), "complaint rejected by validation");
        // les fichiers temporaires partent avec `submission`
        return Err(ServiceError::Validation(errors));
    }

    let attachments = upload_attachments(store.get_ref(), submission.files, &settings.cloudinary.folder).await?;
    let complaint = ComplaintService::create(db.get_ref(), draft, attachments).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "complaintId": complaint.complaint_id,
        "message": "Complaint submitted successfully"
    })))
}

/// GET /api/complaint - Liste des plaintes (PROTÉGÉE)
/// Par défaut celles de l'email demandé ; `admin=true` réservé aux admins et managers
#[get("")]
pub async fn list_complaints(
    auth_user: AuthUser,
    query: web::Query<ComplaintListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let query = query.into_inner();
    let admin_view = query.admin.unwrap_or(false);

    let user_email = if admin_view {
        auth_user.require_role(&[Role::Admin, Role::Manager])?;
        None
    } else {
        let email = query
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| auth_user.email.clone());

        if auth_user.role == Role::User && email != auth_user.email {
            return Err(ServiceError::Forbidden("You can only list your own complaints".to_string()));
        }
        Some(email)
    };

    let filter = ComplaintFilter {
        user_email,
        status: query.status.as_deref().map(parse_status).transpose()?,
        complaint_type: query.complaint_type.filter(|t| !t.trim().is_empty()),
        assigned_to_email: query.assigned_to.filter(|a| !a.trim().is_empty()),
    };

    let complaints = ComplaintService::list(db.get_ref(), &filter).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "complaints": complaints
    })))
}

/// GET /api/complaint/engineer - Plaintes assignées à un ingénieur (PROTÉGÉE)
#[get("/engineer")]
pub async fn engineer_complaints(
    auth_user: AuthUser,
    query: web::Query<EngineerQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    auth_user.require_role(&[Role::Engineer, Role::Admin, Role::Manager])?;

    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let lookup = match (name, auth_user.role) {
        (Some(name), _) => EngineerLookup::Name(name.to_string()),
        (None, Role::Engineer) => EngineerLookup::Email(auth_user.email.clone()),
        (None, _) => return Err(ServiceError::validation("Missing or invalid engineer name parameter.")),
    };

    let complaints = ComplaintService::list_for_engineer(db.get_ref(), &lookup).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "complaints": complaints
    })))
}

/// POST /api/complaint/resolve-reject - Clôture par l'ingénieur (PROTÉGÉE)
#[post("/resolve-reject")]
pub async fn resolve_reject(
    auth_user: AuthUser,
    body: web::Json<ResolveRejectRequest>,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    auth_user.require_role(&[Role::Engineer])?;

    let complaint_id = body
        .id
        .complaint_id()
        .ok_or_else(|| ServiceError::validation("Invalid or missing complaint ID."))?;
    let status = parse_status(&body.status)?;

    let updated = ComplaintService::resolve_or_reject(
        db.get_ref(),
        mailer.get_ref(),
        complaint_id,
        status,
        &body.engineer_message,
    )
    .await?;

    let message = format!("Complaint #{} marked as \"{}\".", complaint_id, status);
    Ok(updated_response(message, updated))
}

/// GET /api/complaint/{complaint_id} - Une plainte (PROTÉGÉE)
#[get("/{complaint_id}")]
pub async fn get_complaint(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let complaint = ComplaintService::find_by_complaint_id(db.get_ref(), path.into_inner()).await?;

    if auth_user.role == Role::User && complaint.user_email != auth_user.email {
        return Err(ServiceError::Forbidden("You can only view your own complaints".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "complaint": complaint
    })))
}

/// PATCH /api/complaint/{complaint_id} - Assignation d'un ingénieur (ADMIN)
#[patch("/{complaint_id}")]
pub async fn assign_complaint(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<AssignRequest>,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ServiceError> {
    auth_user.require_role(&[Role::Admin])?;

    let updated = ComplaintService::assign(db.get_ref(), mailer.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(updated_response("Complaint assigned".to_string(), updated))
}

/// PATCH /api/complaint/{complaint_id}/status - Statut libre (ADMIN, MANAGER)
#[patch("/{complaint_id}/status")]
pub async fn update_status(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<StatusUpdateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    auth_user.require_role(&[Role::Admin, Role::Manager])?;

    let status = parse_status(&body.status)?;
    let complaint = ComplaintService::update_status(db.get_ref(), path.into_inner(), status).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Status updated",
        "complaint": complaint
    })))
}

pub fn complaint_routes(cfg: &mut web::ServiceConfig) {
    // les chemins fixes avant /{complaint_id}
    cfg.service(
        web::scope("/complaint")
            .service(create_complaint)
            .service(list_complaints)
            .service(engineer_complaints)
            .service(resolve_reject)
            .service(get_complaint)
            .service(assign_complaint)
            .service(update_status),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use super::*;
    use crate::routes::configure_routes;
    use crate::services::complaint_form::{ComplaintDraft, MAX_FILE_SIZE};
    use crate::test_support::{TestState, multipart_body, sample_draft, temp_files};

    const DELHI_BRANCH: &str = "70A/32, 3rd floor, Rama Road, Kirti Nagar, Delhi-110015";

    fn jane_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Name", "Jane Doe"),
            ("Email", "jane@x.com"),
            ("Phone Number", "9876543210"),
            ("Complaint Type", "Software"),
            ("Location", "Delhi"),
            ("Company Name", DELHI_BRANCH),
            ("Title", "App crash"),
            ("Description", "The billing app crashes on start."),
        ]
    }

    async fn seed(state: &TestState, draft: ComplaintDraft) -> i32 {
        ComplaintService::create(&state.db, draft, vec![]).await.unwrap().complaint_id
    }

    #[actix_web::test]
    async fn test_submit_example_complaint() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let (content_type, payload) = multipart_body(&jane_fields(), &[]);
        let req = test::TestRequest::post()
            .uri("/api/complaint")
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        let complaint_id = body["complaintId"].as_i64().unwrap() as i32;
        assert!((1000..=9999).contains(&complaint_id));

        let stored = ComplaintService::find_by_complaint_id(&state.db, complaint_id).await.unwrap();
        assert_eq!(stored.status, ComplaintStatus::Pending);
        assert_eq!(stored.name, "Jane Doe");
        assert_eq!(stored.company_address, DELHI_BRANCH);
    }

    #[actix_web::test]
    async fn test_submit_lists_every_error() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let (content_type, payload) = multipart_body(
            &[("Name", "Jane Doe"), ("Email", "not-an-email")],
            &[("notes.txt", "text/plain", b"hello".as_slice())],
        );
        let req = test::TestRequest::post()
            .uri("/api/complaint")
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        let errors: Vec<String> = serde_json::from_value(body["errors"].clone()).unwrap();
        assert!(errors.contains(&"Please enter a valid email address".to_string()));
        assert!(errors.contains(&"Phone Number is required".to_string()));
        assert!(errors.contains(&"Description is required".to_string()));
        assert!(errors.contains(&"File type not supported: notes.txt".to_string()));
        assert!(temp_files(&state.settings.uploads.temp_dir).is_empty());
        assert!(state.store.uploaded_keys().is_empty());
    }

    #[actix_web::test]
    async fn test_submit_with_attachment() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let (content_type, payload) = multipart_body(&jane_fields(), &[("screen shot.png", "image/png", b"\x89PNG-data".as_slice())]);
        let req = test::TestRequest::post()
            .uri("/api/complaint")
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let complaint_id = body["complaintId"].as_i64().unwrap() as i32;
        let stored = ComplaintService::find_by_complaint_id(&state.db, complaint_id).await.unwrap();
        assert_eq!(stored.attachments.0.len(), 1);
        assert_eq!(stored.attachments.0[0].name, "screen shot.png");
        assert!(state.store.uploaded_keys()[0].starts_with("complaints/screen_shot.png_"));
        assert!(temp_files(&state.settings.uploads.temp_dir).is_empty());
    }

    #[actix_web::test]
    async fn test_assign_with_empty_assignee_is_rejected() {
        let state = TestState::new().await;
        let complaint_id = seed(&state, sample_draft()).await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/api/complaint/{}", complaint_id))
            .insert_header(state.bearer(Role::Admin, "admin@corp.in"))
            .set_json(json!({"assignedTo": "", "assignedToEmail": "ravi@corp.in"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let stored = ComplaintService::find_by_complaint_id(&state.db, complaint_id).await.unwrap();
        assert_eq!(stored.status, ComplaintStatus::Pending);
        assert!(stored.assigned_to_email.is_empty());
        assert!(state.mailer.sent().is_empty());
    }

    #[actix_web::test]
    async fn test_assign_then_engineer_resolves() {
        let state = TestState::new().await;
        let complaint_id = seed(&state, sample_draft()).await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/api/complaint/{}", complaint_id))
            .insert_header(state.bearer(Role::Admin, "admin@corp.in"))
            .set_json(json!({"assignedTo": "Ravi Kumar", "assignedToEmail": "ravi@corp.in"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["complaint"]["status"], "in_progress");

        let req = test::TestRequest::get()
            .uri("/api/complaint/engineer")
            .insert_header(state.bearer(Role::Engineer, "ravi@corp.in"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["complaints"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri("/api/complaint/resolve-reject")
            .insert_header(state.bearer(Role::Engineer, "ravi@corp.in"))
            .set_json(json!({"id": complaint_id.to_string(), "status": "Resolved", "engineerMessage": "Reinstalled"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["complaint"]["resolutionMessage"], "Reinstalled");
        assert!(body.get("warning").is_none());

        let sent = state.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to, "jane@x.com");
    }

    #[actix_web::test]
    async fn test_role_checks() {
        let state = TestState::new().await;
        let complaint_id = seed(&state, sample_draft()).await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let user_admin_view = test::TestRequest::get()
            .uri("/api/complaint?admin=true")
            .insert_header(state.bearer(Role::User, "jane@x.com"))
            .to_request();
        assert_eq!(test::call_service(&app, user_admin_view).await.status(), StatusCode::FORBIDDEN);

        let other_email = test::TestRequest::get()
            .uri("/api/complaint?email=someone@else.in")
            .insert_header(state.bearer(Role::User, "jane@x.com"))
            .to_request();
        assert_eq!(test::call_service(&app, other_email).await.status(), StatusCode::FORBIDDEN);

        let manager_assign = test::TestRequest::patch()
            .uri(&format!("/api/complaint/{}", complaint_id))
            .insert_header(state.bearer(Role::Manager, "meera@corp.in"))
            .set_json(json!({"assignedTo": "Ravi", "assignedToEmail": "ravi@corp.in"}))
            .to_request();
        assert_eq!(test::call_service(&app, manager_assign).await.status(), StatusCode::FORBIDDEN);

        let manager_status = test::TestRequest::patch()
            .uri(&format!("/api/complaint/{}/status", complaint_id))
            .insert_header(state.bearer(Role::Manager, "meera@corp.in"))
            .set_json(json!({"status": "rejected"}))
            .to_request();
        assert_eq!(test::call_service(&app, manager_status).await.status(), StatusCode::OK);
        assert!(state.mailer.sent().is_empty());

        let anonymous = test::TestRequest::get().uri("/api/complaint").to_request();
        assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_list_own_and_admin_view() {
        let state = TestState::new().await;
        seed(&state, sample_draft()).await;
        let mut other = sample_draft();
        other.user_email = "someone@else.in".to_string();
        seed(&state, other).await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let own = test::TestRequest::get()
            .uri("/api/complaint")
            .insert_header(state.bearer(Role::User, "jane@x.com"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, own).await;
        assert_eq!(body["complaints"].as_array().unwrap().len(), 1);

        let all = test::TestRequest::get()
            .uri("/api/complaint?admin=true&status=pending")
            .insert_header(state.bearer(Role::Admin, "admin@corp.in"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, all).await;
        assert_eq!(body["complaints"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_unknown_complaint() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/complaint/4242")
            .insert_header(state.bearer(Role::Admin, "admin@corp.in"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_malformed_id_and_query_use_json_errors() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/complaint/not-a-number")
            .insert_header(state.bearer(Role::Admin, "admin@corp.in"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        let req = test::TestRequest::get()
            .uri("/api/complaint?admin=maybe")
            .insert_header(state.bearer(Role::Admin, "admin@corp.in"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_oversized_attachment_is_rejected_and_cleaned_up() {
        let state = TestState::new().await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg)).configure(configure_routes)).await;

        let big = vec![0u8; MAX_FILE_SIZE as usize + 1];
        let (content_type, payload) = multipart_body(&jane_fields(), &[("big.png", "image/png", big.as_slice())]);
        let req = test::TestRequest::post()
            .uri("/api/complaint")
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"], json!(["File \"big.png\" exceeds 5MB limit"]));
        assert!(temp_files(&state.settings.uploads.temp_dir).is_empty());
        assert!(state.store.uploaded_keys().is_empty());
    }
}
