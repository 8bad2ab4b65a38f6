// Outils partagés par les tests : base SQLite en mémoire, doubles du mailer et de l'asset host

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use crate::config::Settings;
use crate::db;
use crate::models::accounts::{self, Role};
use crate::models::dto::Identity;
use crate::services::asset_store::{AssetStore, UploadError, UploadedAsset};
use crate::services::complaint_form::ComplaintDraft;
use crate::services::mailer::{MailError, Mailer, OutgoingEmail};
use crate::services::uploads::StagedFile;
use crate::utils::{jwt, password};

/// Base SQLite en mémoire avec le schéma complet ; une seule connexion pour garder la base
pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    db::create_schema(&db).await.unwrap();
    db
}

pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("complaint-desk-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub async fn staged(dir: &Path, name: &str, content_type: &str, bytes: &[u8]) -> StagedFile {
    StagedFile::from_bytes(dir, name, content_type, bytes).await.unwrap()
}

/// Fichiers encore présents dans le dossier temporaire
pub fn temp_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

pub async fn seed_account(
    db: &DatabaseConnection,
    role: Role,
    name: &str,
    email: &str,
    plain_password: &str,
    otp_required: bool,
) -> accounts::Model {
    let phone = format!("9{:09}", rand::thread_rng().gen_range(0..1_000_000_000u32));
    let now = Utc::now();

    accounts::ActiveModel {
        role: Set(role),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        phone: Set(phone),
        password_hash: Set(password::hash_password(plain_password).unwrap()),
        previous_password_hash: Set(None),
        otp_hash: Set(None),
        otp_expires_at: Set(None),
        otp_sent_at: Set(None),
        otp_verified: Set(false),
        otp_required: Set(otp_required),
        reset_token_hash: Set(None),
        reset_token_expires_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn sample_draft() -> ComplaintDraft {
    ComplaintDraft {
        name: "Jane Doe".to_string(),
        user_email: "jane@x.com".to_string(),
        phone: "9876543210".to_string(),
        complaint_type: "Software".to_string(),
        complaint_sub_type: Some("Application Crash".to_string()),
        location: "Delhi".to_string(),
        company_address: "70A/32, 3rd floor, Rama Road, Kirti Nagar, Delhi-110015".to_string(),
        title: "App crash".to_string(),
        description: "The billing app crashes on start.".to_string(),
    }
}

// ---------------------------------------------------------------- mailer

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        RecordingMailer {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Premier nombre à 6 chiffres du texte de l'email
pub fn sent_code(email: &OutgoingEmail) -> String {
    email
        .text
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 6)
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------- asset host

#[derive(Default)]
pub struct MockAssetStore {
    keys: Mutex<Vec<String>>,
    fail: bool,
}

impl MockAssetStore {
    pub fn succeeding() -> Self {
        MockAssetStore::default()
    }

    pub fn failing() -> Self {
        MockAssetStore {
            keys: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn upload(&self, path: &Path, public_id: &str, content_type: &str) -> Result<UploadedAsset, UploadError> {
        if self.fail {
            return Err(UploadError::Rejected {
                status: 400,
                message: "Invalid image file".to_string(),
            });
        }

        let bytes = tokio::fs::metadata(path).await?.len() as i64;
        self.keys.lock().unwrap().push(public_id.to_string());

        let resource_type = if content_type.starts_with("image/") { "image" } else { "raw" };
        Ok(UploadedAsset {
            url: format!("https://res.cloudinary.test/{}", public_id),
            resource_type: resource_type.to_string(),
            bytes,
        })
    }
}

// ---------------------------------------------------------------- http

/// Corps multipart/form-data : (content-type avec boundary, octets)
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = format!("----complaint-desk-{}", Uuid::new_v4().simple());
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }

    for (file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                boundary, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// État applicatif des tests HTTP, enregistré comme dans main
pub struct TestState {
    pub db: DatabaseConnection,
    pub settings: Settings,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<MockAssetStore>,
}

impl TestState {
    pub async fn new() -> Self {
        TestState {
            db: memory_db().await,
            settings: Settings::for_tests(scratch_dir()),
            mailer: Arc::new(RecordingMailer::default()),
            store: Arc::new(MockAssetStore::succeeding()),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let mailer: Arc<dyn Mailer> = self.mailer.clone();
        let store: Arc<dyn AssetStore> = self.store.clone();

        cfg.app_data(web::Data::new(self.db.clone()))
            .app_data(web::Data::new(self.settings.clone()))
            .app_data(web::Data::from(mailer))
            .app_data(web::Data::from(store));
    }

    /// Header Authorization pour une session du rôle donné
    pub fn bearer(&self, role: Role, email: &str) -> (&'static str, String) {
        let identity = Identity {
            id: 1,
            email: email.to_string(),
            name: "Test Account".to_string(),
            role,
        };
        let token = jwt::generate_token(&identity, &self.settings.auth.jwt_secret, self.settings.auth.session_ttl()).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }
}
