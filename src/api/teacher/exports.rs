use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::schemas::teacher::ExportQuery;
use crate::schemas::types::ExportKind;

pub(super) async fn download_export(
    Path((course_id, kind)): Path<(i64, String)>,
    Query(query): Query<ExportQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let kind = ExportKind::parse(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown export '{kind}'")))?;

    let payload = state.backend().export(&teacher.token, course_id, kind, query.anonymize).await?;

    let content_type = payload
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(default_content_type(kind)));
    let disposition = payload
        .content_disposition
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .or_else(|| {
            let filename = kind.default_filename(course_id);
            HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")).ok()
        });

    tracing::info!(course_id, bytes = payload.bytes.len(), anonymize = query.anonymize, "Export served");

    let mut response = payload.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(disposition) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

fn default_content_type(kind: ExportKind) -> &'static str {
    match kind {
        ExportKind::CsvDetailed | ExportKind::CsvAggregated => "text/csv; charset=utf-8",
        ExportKind::Archive => "application/zip",
    }
}
