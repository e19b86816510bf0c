use std::collections::HashMap;

use axum::extract::Multipart;

use crate::api::errors::ApiError;
use crate::api::validation::validate_upload;
use crate::core::config::Settings;
use crate::services::uploads::UploadedFile;

/// A multipart form with one `file` part and any number of text fields.
pub(crate) struct UploadForm {
    pub(crate) file: UploadedFile,
    pub(crate) fields: HashMap<String, String>,
}

pub(crate) async fn read_upload_form(
    mut multipart: Multipart,
    settings: &Settings,
) -> Result<UploadForm, ApiError> {
    let uploads = settings.uploads();
    let max_bytes = uploads.max_upload_bytes();

    let mut file: Option<UploadedFile> = None;
    let mut fields = HashMap::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field.file_name().map(str::to_string).unwrap_or_default();
            let content_type = field.content_type().map(str::to_string);
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File size exceeds {}MB limit",
                        uploads.max_upload_size_mb
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file = Some(UploadedFile { file_name, content_type, bytes });
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid field '{name}'")))?;
            fields.insert(name, text);
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    validate_upload(
        &file.file_name,
        file.bytes.len() as u64,
        &uploads.allowed_extensions,
        uploads.max_upload_size_mb,
    )?;

    Ok(UploadForm { file, fields })
}
