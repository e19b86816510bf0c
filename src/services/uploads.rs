//! Presign, upload and hand back the object key. The bytes only pass through.

use crate::schemas::backend::PresignResponse;
use crate::services::backend::{BackendClient, BackendError};

pub(crate) const STUDENT_SUBMISSIONS_PREFIX: &str = "student-submissions";
pub(crate) const REVISION_FEEDBACK_PREFIX: &str = "revision-feedback";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub(crate) struct UploadedFile {
    pub(crate) file_name: String,
    pub(crate) content_type: Option<String>,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub(crate) file_key: String,
    pub(crate) original_file_name: String,
    pub(crate) content_type: String,
    pub(crate) size_bytes: i64,
}

/// Keeps the last path component and drops control characters.
pub(crate) fn sanitized_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "plik".to_string()
    } else {
        cleaned.to_string()
    }
}

pub(crate) async fn store_via_presign(
    backend: &BackendClient,
    token: &str,
    prefix: &str,
    file: UploadedFile,
) -> Result<StoredObject, BackendError> {
    let original_file_name = sanitized_file_name(&file.file_name);
    let content_type = file
        .content_type
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
    let size_bytes = file.bytes.len() as i64;

    let PresignResponse { file_key, upload_url, .. } =
        backend.presign(token, prefix, &original_file_name).await?;

    backend.upload_object(&upload_url, file.bytes, Some(&content_type)).await?;

    tracing::info!(prefix, file_key = %file_key, size_bytes, "Uploaded object via presigned URL");

    Ok(StoredObject { file_key, original_file_name, content_type, size_bytes })
}
