use std::path::Path;

use axum_typed_multipart::FieldData;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mime_guess::from_path;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::AppError;

/// A file handed to the analysis model as extra context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DreamAttachment {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    /// Raw base64 payload, without a data-URL prefix.
    pub data: String,
    pub byte_len: usize,
}

impl DreamAttachment {
    pub fn from_bytes(
        file_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self, AppError> {
        let mime_type = match mime_type {
            Some(declared) if declared != mime::APPLICATION_OCTET_STREAM.as_ref() => {
                declared.to_string()
            }
            _ => Self::guess_mime_type(Path::new(file_name)),
        };

        if !Self::is_supported(&mime_type) {
            return Err(AppError::Validation(format!(
                "Unsupported attachment type {mime_type} for {file_name}; only images and PDFs are accepted"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            mime_type,
            data: STANDARD.encode(bytes),
            byte_len: bytes.len(),
        })
    }

    pub async fn from_path(path: &Path, max_bytes: usize) -> Result<Self, AppError> {
        let file_name = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        let bytes = tokio::fs::read(path).await?;
        ensure_within_limit(&file_name, bytes.len(), max_bytes)?;

        Self::from_bytes(&file_name, None, &bytes)
    }

    pub async fn from_field_data(
        field_data: FieldData<NamedTempFile>,
        max_bytes: usize,
    ) -> Result<Self, AppError> {
        let file_name = field_data
            .metadata
            .file_name
            .unwrap_or_else(|| "attachment".to_string());
        let on_disk = tokio::fs::metadata(field_data.contents.path()).await?.len();
        ensure_within_limit(
            &file_name,
            usize::try_from(on_disk).unwrap_or(usize::MAX),
            max_bytes,
        )?;
        let bytes = tokio::fs::read(field_data.contents.path()).await?;

        Self::from_bytes(
            &file_name,
            field_data.metadata.content_type.as_deref(),
            &bytes,
        )
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    fn guess_mime_type(path: &Path) -> String {
        from_path(path)
            .first_or(mime::APPLICATION_OCTET_STREAM)
            .to_string()
    }

    fn is_supported(mime_type: &str) -> bool {
        mime_type.starts_with("image/") || mime_type == mime::APPLICATION_PDF.as_ref()
    }
}

fn ensure_within_limit(file_name: &str, len: usize, max_bytes: usize) -> Result<(), AppError> {
    if len > max_bytes {
        return Err(AppError::Validation(format!(
            "Attachment {file_name} exceeds the {max_bytes} byte limit"
        )));
    }
    Ok(())
}
