// ============================================================================
// UPLOADS : lecture du formulaire multipart et pièces jointes
// ============================================================================
//
// Description:
//   Les fichiers reçus sont écrits dans le dossier temporaire, validés, puis
//   envoyés à l'asset host. Chaque fichier temporaire est supprimé quand son
//   StagedFile est droppé, que l'upload réussisse ou non.
//
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::asset_store::AssetStore;
use super::complaint_form::FileRules;
use crate::error::{ServiceError, ServiceResult};
use crate::models::complaints::Attachment;

/// Nom du champ multipart qui porte les pièces jointes
pub const FILES_FIELD: &str = "files";

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Fichier reçu et écrit sur disque, supprimé au drop
#[derive(Debug)]
pub struct StagedFile {
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub path: PathBuf,
}

impl StagedFile {
    fn staging_path(dir: &Path, original_name: &str) -> PathBuf {
        dir.join(format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name)))
    }

    #[cfg(test)]
    pub async fn from_bytes(dir: &Path, original_name: &str, content_type: &str, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = Self::staging_path(dir, original_name);
        tokio::fs::write(&path, bytes).await?;

        Ok(StagedFile {
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            path,
        })
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to delete temp file");
            }
        }
    }
}

/// Contenu d'un formulaire de plainte une fois lu
#[derive(Debug, Default)]
pub struct ComplaintSubmission {
    pub fields: HashMap<String, String>,
    pub files: Vec<StagedFile>,
    /// Nombre total de fichiers reçus, y compris ceux ignorés au-delà de la limite
    pub received_files: usize,
}

fn malformed() -> ServiceError {
    ServiceError::validation("Failed to parse form data")
}

/// Lit le multipart : champs texte (première valeur gagnante) et fichiers `files`
pub async fn read_submission(mut payload: Multipart, temp_dir: &Path, rules: &FileRules) -> ServiceResult<ComplaintSubmission> {
    let mut submission = ComplaintSubmission::default();

    while let Some(mut field) = payload.try_next().await.map_err(|_| malformed())? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match file_name {
            Some(file_name) if name == FILES_FIELD => {
                if file_name.is_empty() {
                    drain(&mut field).await?;
                    continue;
                }

                submission.received_files += 1;
                if submission.files.len() >= rules.max_count {
                    drain(&mut field).await?;
                    continue;
                }

                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let staged = stage_field(&mut field, temp_dir, &file_name, &content_type, rules.max_file_size).await?;
                submission.files.push(staged);
            }
            Some(_) => drain(&mut field).await?,
            None => {
                let mut value = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|_| malformed())?;
                    if value.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(ServiceError::validation(format!("{} is too long", name)));
                    }
                    value.extend_from_slice(&chunk);
                }

                let value = String::from_utf8(value).map_err(|_| malformed())?;
                submission.fields.entry(name).or_insert(value);
            }
        }
    }

    Ok(submission)
}

async fn drain(field: &mut actix_multipart::Field) -> ServiceResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|_| malformed())?;
    }
    Ok(())
}

// au-delà de `max_size` on n'écrit plus, mais la taille réelle reste comptée
// pour que la validation signale le dépassement
async fn stage_field(
    field: &mut actix_multipart::Field,
    dir: &Path,
    original_name: &str,
    content_type: &str,
    max_size: u64,
) -> ServiceResult<StagedFile> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ServiceError::Internal(format!("failed to create temp dir: {}", e)))?;

    let path = StagedFile::staging_path(dir, original_name);
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ServiceError::Internal(format!("failed to create temp file: {}", e)))?;

    // le StagedFile existe dès maintenant pour que le fichier soit nettoyé même en cas d'erreur
    let mut staged = StagedFile {
        original_name: original_name.to_string(),
        content_type: content_type.to_string(),
        size: 0,
        path,
    };

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|_| malformed())?;
        let previous = staged.size;
        staged.size += chunk.len() as u64;

        if previous < max_size {
            let keep = ((max_size - previous) as usize).min(chunk.len());
            file.write_all(&chunk[..keep])
                .await
                .map_err(|e| ServiceError::Internal(format!("failed to write temp file: {}", e)))?;
        }
    }

    file.flush()
        .await
        .map_err(|e| ServiceError::Internal(format!("failed to write temp file: {}", e)))?;

    Ok(staged)
}

/// Garde `[A-Za-z0-9._-]`, remplace le reste par `_`, tronque à 100 caractères
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .take(100)
        .collect()
}

pub fn object_key(folder: &str, original_name: &str, now: DateTime<Utc>) -> String {
    format!("{}/{}_{}", folder, sanitize_filename(original_name), now.timestamp_millis())
}

/// Upload un fichier ; le fichier temporaire est supprimé quel que soit le résultat
pub async fn upload_attachment(store: &dyn AssetStore, staged: StagedFile, folder: &str) -> ServiceResult<Attachment> {
    let key = object_key(folder, &staged.original_name, Utc::now());
    let result = store.upload(&staged.path, &key, &staged.content_type).await;
    let original_name = staged.original_name.clone();
    drop(staged);

    match result {
        Ok(asset) => Ok(Attachment {
            url: asset.url,
            name: original_name,
            kind: asset.resource_type,
            size: asset.bytes,
        }),
        Err(e) => {
            tracing::error!(file = %original_name, error = %e, "failed to upload attachment");
            Err(e.into())
        }
    }
}

/// Uploads séquentiels, arrêt au premier échec (les fichiers restants sont droppés donc supprimés)
pub async fn upload_attachments(store: &dyn AssetStore, files: Vec<StagedFile>, folder: &str) -> ServiceResult<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(files.len());
    for staged in files {
        attachments.push(upload_attachment(store, staged, folder).await?);
    }
    Ok(attachments)
}
