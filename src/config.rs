// configuration depuis .env / variables d'environnement (crate config)

use std::path::PathBuf;

use chrono::Duration;
use ::config::{Config, Environment, Map};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
    pub cloudinary: CloudinaryConfig,
    pub uploads: UploadConfig,
    /// Base des liens envoyés par email (reset password)
    pub app_base_url: String,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub otp_ttl_minutes: i64,
    pub otp_resend_seconds: i64,
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    pub fn otp_ttl(&self) -> Duration {
        Duration::minutes(self.otp_ttl_minutes)
    }

    pub fn otp_resend_interval(&self) -> Duration {
        Duration::seconds(self.otp_resend_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub temp_dir: PathBuf,
    pub max_files: usize,
}

// Vue à plat des variables d'environnement, une clé par variable
#[derive(Debug, Deserialize)]
struct FlatConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    database_url: String,
    #[serde(default = "default_max_connections")]
    database_max_connections: u32,
    #[serde(default = "default_true")]
    auto_migrate: bool,

    jwt_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    session_ttl_hours: i64,
    #[serde(default = "default_otp_ttl_minutes")]
    otp_ttl_minutes: i64,
    #[serde(default = "default_otp_resend_seconds")]
    otp_resend_seconds: i64,

    #[serde(default = "default_smtp_host")]
    smtp_host: String,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    #[serde(default)]
    smtp_username: Option<String>,
    #[serde(default)]
    smtp_password: Option<String>,
    #[serde(default = "default_smtp_from")]
    smtp_from: String,

    #[serde(default)]
    cloudinary_cloud_name: String,
    #[serde(default)]
    cloudinary_api_key: String,
    #[serde(default)]
    cloudinary_api_secret: String,
    #[serde(default = "default_folder")]
    cloudinary_folder: String,

    #[serde(default = "default_temp_dir")]
    upload_temp_dir: PathBuf,
    #[serde(default = "default_max_files")]
    upload_max_files: usize,

    #[serde(default = "default_app_base_url")]
    app_base_url: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_connections() -> u32 {
    10
}
fn default_true() -> bool {
    true
}
fn default_session_ttl_hours() -> i64 {
    30 * 24
}
fn default_otp_ttl_minutes() -> i64 {
    10
}
fn default_otp_resend_seconds() -> i64 {
    30
}
fn default_smtp_host() -> String {
    "localhost".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_smtp_from() -> String {
    "Support Team <support@localhost>".to_string()
}
fn default_folder() -> String {
    "complaints".to_string()
}
fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp_uploads")
}
fn default_max_files() -> usize {
    5
}
fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Charge `.env` puis lit la configuration depuis l'environnement.
    /// Les variables d'environnement l'emportent sur le fichier `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load(None)
    }

    /// `source` remplace l'environnement du process (tests)
    pub fn load(source: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let flat: FlatConfig = Config::builder()
            .add_source(Environment::default().try_parsing(true).source(source))
            .build()?
            .try_deserialize()?;

        Ok(flat.into())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

impl From<FlatConfig> for Settings {
    fn from(flat: FlatConfig) -> Self {
        Settings {
            server: ServerConfig {
                host: flat.host,
                port: flat.port,
            },
            database: DatabaseConfig {
                url: flat.database_url,
                max_connections: flat.database_max_connections,
                auto_migrate: flat.auto_migrate,
            },
            auth: AuthConfig {
                jwt_secret: flat.jwt_secret,
                session_ttl_hours: flat.session_ttl_hours,
                // le code OTP vit entre 5 et 15 minutes
                otp_ttl_minutes: flat.otp_ttl_minutes.clamp(5, 15),
                otp_resend_seconds: flat.otp_resend_seconds,
            },
            smtp: SmtpConfig {
                host: flat.smtp_host,
                port: flat.smtp_port,
                username: flat.smtp_username.filter(|v| !v.trim().is_empty()),
                password: flat.smtp_password.filter(|v| !v.is_empty()),
                from: flat.smtp_from,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: flat.cloudinary_cloud_name,
                api_key: flat.cloudinary_api_key,
                api_secret: flat.cloudinary_api_secret,
                folder: flat.cloudinary_folder,
            },
            uploads: UploadConfig {
                temp_dir: flat.upload_temp_dir,
                max_files: flat.upload_max_files,
            },
            app_base_url: flat.app_base_url.trim_end_matches('/').to_string(),
            log_level: flat.log_level,
        }
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests(temp_dir: PathBuf) -> Self {
        Settings {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                auto_migrate: true,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                session_ttl_hours: 4,
                otp_ttl_minutes: 10,
                otp_resend_seconds: 30,
            },
            smtp: SmtpConfig {
                host: "localhost".to_string(),
                port: 2525,
                username: None,
                password: None,
                from: "Support Team <support@test.local>".to_string(),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                folder: "complaints".to_string(),
            },
            uploads: UploadConfig {
                temp_dir,
                max_files: 5,
            },
            app_base_url: "http://localhost:3000".to_string(),
            log_level: "debug".to_string(),
        }
    }
}
