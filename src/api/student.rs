use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::uploads::read_upload_form;
use crate::core::state::AppState;
use crate::schemas::backend::{RevisionRecord, SubmitRevisionRequest};
use crate::schemas::student::{
    CoursesResponse, HistoryQuery, HistoryResponse, OverviewItem, OverviewQuery, OverviewResponse,
    SubmitRevisionResponse,
};
use crate::schemas::types::RevisionStatus;
use crate::schemas::LatenessView;
use crate::services::evaluator::{
    can_resubmit, first_submission_at, format_points, lateness_percent, meets_pass_threshold,
    stage_ordinal, status_label, LatenessBadge,
};
use crate::services::session_summary::summarize;
use crate::services::task_filters::{filter_overview, session_options, SessionFilter, StatusFilter};
use crate::services::uploads::{store_via_presign, STUDENT_SUBMISSIONS_PREFIX};


const MAX_COMMENT_CHARS: usize = 2000;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/:course_id/overview", get(course_overview))
        .route("/artifacts/:artifact_id/history", get(artifact_history))
        .route("/artifacts/:artifact_id/revisions", post(submit_revision))
}

/// Status of the most recent revision, by submission time.
fn latest_status(history: &[RevisionRecord]) -> Option<RevisionStatus> {
    history
        .iter()
        .max_by(|a, b| a.created_at.cmp(&b.created_at))
        .map(|revision| revision.status.unwrap_or(RevisionStatus::Submitted))
}

async fn list_courses(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<CoursesResponse>, ApiError> {
    let courses = state.backend().student_courses(&student.token).await?;
    Ok(Json(CoursesResponse { courses }))
}

async fn course_overview(
    Path(course_id): Path<i64>,
    Query(query): Query<OverviewQuery>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let status = StatusFilter::parse(query.status.as_deref()).ok_or_else(|| {
        ApiError::BadRequest("status must be one of ALL, DONE, FAILED, TODO, FIX".to_string())
    })?;
    let session = SessionFilter::parse(query.session.as_deref());

    let overview = state.backend().student_overview(&student.token, course_id).await?;
    let options = session_options(overview.iter().map(|item| item.session_name.as_deref()));

    let filtered: Vec<_> = filter_overview(&overview, &session, status).into_iter().cloned().collect();
    let sessions = summarize(&filtered);

    let items = filtered
        .into_iter()
        .map(|task| {
            let mode = task.mode();
            OverviewItem {
                status_label: status_label(task.last_revision_status),
                can_resubmit: can_resubmit(task.last_revision_status),
                points_display: format_points(task.last_points_netto, mode, task.max_points),
                meets_pass_threshold: task.last_points_netto.and_then(|points| {
                    meets_pass_threshold(points, task.pass_threshold, mode, task.max_points)
                }),
                task,
            }
        })
        .collect();

    Ok(Json(OverviewResponse { items, sessions, session_options: options }))
}

async fn artifact_history(
    Path(artifact_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let backend = state.backend();
    let mut history = backend.own_revision_history(&student.token, artifact_id).await?;

    let first_submission = first_submission_at(&history);
    let latest = latest_status(&history);

    let lateness = match query.course_id {
        Some(course_id) => {
            let overview = backend.student_overview(&student.token, course_id).await?;
            overview.into_iter().find(|item| item.artifact_id == artifact_id).and_then(|item| {
                let percent =
                    lateness_percent(item.soft_deadline, item.hard_deadline, first_submission);
                let last_submitted = item.last_submitted_at.or(first_submission);
                let badge = LatenessBadge::evaluate(last_submitted, percent);
                (item.soft_deadline.is_some() || item.hard_deadline.is_some())
                    .then(|| LatenessView::new(badge, percent))
            })
        }
        None => None,
    };

    history.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(HistoryResponse {
        artifact_id,
        stage: stage_ordinal(history.len()),
        first_submission_at: first_submission,
        latest_status: latest,
        status_label: status_label(latest),
        can_resubmit: can_resubmit(latest),
        lateness,
        history,
    }))
}

async fn submit_revision(
    Path(artifact_id): Path<i64>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmitRevisionResponse>, ApiError> {
    let backend = state.backend();

    let history = backend.own_revision_history(&student.token, artifact_id).await?;
    let latest = latest_status(&history);
    if !can_resubmit(latest) {
        return Err(ApiError::Conflict(format!(
            "A new revision is not allowed while the latest one is {}",
            latest.map(RevisionStatus::as_str).unwrap_or("SUBMITTED")
        )));
    }

    let mut form = read_upload_form(multipart, state.settings()).await?;
    let comment = form
        .fields
        .remove("comment")
        .map(|comment| comment.trim().to_string())
        .filter(|comment| !comment.is_empty());
    if comment.as_ref().is_some_and(|comment| comment.chars().count() > MAX_COMMENT_CHARS) {
        return Err(ApiError::BadRequest(format!(
            "comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    let stored =
        store_via_presign(backend, &student.token, STUDENT_SUBMISSIONS_PREFIX, form.file).await?;

    let revision = backend
        .submit_revision(
            &student.token,
            &SubmitRevisionRequest {
                artifact_id,
                file_key: stored.file_key.clone(),
                original_file_name: stored.original_file_name.clone(),
                mime_type: Some(stored.content_type),
                size_bytes: Some(stored.size_bytes),
                comment,
            },
        )
        .await?;

    tracing::info!(
        artifact_id,
        student_id = student.profile.id,
        stage = stage_ordinal(history.len() + 1),
        "Revision submitted"
    );

    Ok(Json(SubmitRevisionResponse {
        artifact_id,
        file_key: stored.file_key,
        original_file_name: stored.original_file_name,
        size_bytes: stored.size_bytes,
        revision,
    }))
}
