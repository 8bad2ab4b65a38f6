// Hébergement des pièces jointes (API d'upload signée type Cloudinary)

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read staged file: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("asset host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Ce que l'asset host renvoie pour un fichier uploadé
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
    pub resource_type: String,
    pub bytes: i64,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload le fichier local `path` sous la clé `public_id` (dossier inclus)
    async fn upload(&self, path: &Path, public_id: &str, content_type: &str) -> Result<UploadedAsset, UploadError>;
}

pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
    resource_type: String,
    bytes: i64,
}

#[derive(Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        CloudinaryStore {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/auto/upload",
            self.config.cloud_name
        )
    }
}

/// Signature Cloudinary : paramètres triés `k=v&k=v` suivis du secret, SHA-256 en hex
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    async fn upload(&self, path: &Path, public_id: &str, content_type: &str) -> Result<UploadedAsset, UploadError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let signed = vec![
            ("overwrite", "false".to_string()),
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let signature = sign_params(&signed, &self.config.api_secret);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in signed {
            form = form.text(key, value);
        }

        let response = self.client.post(self.endpoint()).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<CloudinaryErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: CloudinaryResponse = response.json().await?;
        Ok(UploadedAsset {
            url: body.secure_url,
            resource_type: body.resource_type,
            bytes: body.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_order_independent() {
        let a = sign_params(
            &[("timestamp", "1700000000".to_string()), ("folder", "complaints".to_string())],
            "secret",
        );
        let b = sign_params(
            &[("folder", "complaints".to_string()), ("timestamp", "1700000000".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let params = [("public_id", "complaints/a_1".to_string())];
        assert_ne!(sign_params(&params, "one"), sign_params(&params, "two"));
    }
}
