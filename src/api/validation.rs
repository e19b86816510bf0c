use std::path::Path;

use crate::api::errors::ApiError;
use crate::schemas::types::GradingMode;
use crate::services::evaluator::points_ceiling;

pub(crate) fn validate_upload(
    file_name: &str,
    size_bytes: u64,
    allowed_extensions: &[String],
    max_upload_size_mb: u64,
) -> Result<(), ApiError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    if size_bytes == 0 {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    if size_bytes > max_upload_size_mb * 1024 * 1024 {
        return Err(ApiError::PayloadTooLarge(format!(
            "File size exceeds {max_upload_size_mb}MB limit"
        )));
    }

    Ok(())
}

/// Points must lie within `[0, ceiling]` of the task's grading mode.
pub(crate) fn validate_points(
    points: f64,
    mode: GradingMode,
    max_points: Option<f64>,
) -> Result<(), ApiError> {
    let ceiling = points_ceiling(mode, max_points);
    if points.is_finite() && (0.0..=ceiling).contains(&points) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("points must be between 0 and {ceiling}")))
    }
}
