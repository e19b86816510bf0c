use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use validator::Validate;

use super::{annotate, find_task};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::uploads::read_upload_form;
use crate::api::validation::validate_points;
use crate::core::state::AppState;
use crate::schemas::backend::{FeedbackMaterialRequest, GradeRevisionRequest};
use crate::schemas::teacher::{
    EntryDetailResponse, FeedbackUploadResponse, GradeFormDefaults, GradeRequest, GradeResponse,
};
use crate::schemas::types::RevisionStatus;
use crate::schemas::LatenessView;
use crate::services::evaluator::{
    below_pass_warning, can_grade, first_submission_at, format_points, lateness_percent,
    meets_pass_threshold, points_ceiling, status_transition_allowed, LatenessBadge,
};
use crate::services::late_penalty::{netto_preview, penalty_percent, LatePolicy};
use crate::services::uploads::{store_via_presign, REVISION_FEEDBACK_PREFIX};

pub(super) async fn entry_detail(
    Path((course_id, artifact_id, student_id)): Path<(i64, i64, i64)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<EntryDetailResponse>, ApiError> {
    let backend = state.backend();
    let (tasks, queue, mut history) = tokio::try_join!(
        backend.course_tasks(&teacher.token, course_id),
        backend.teacher_queue(&teacher.token, course_id),
        backend.revision_history(&teacher.token, artifact_id, student_id),
    )?;

    let entry = queue
        .into_iter()
        .find(|entry| entry.artifact_id == artifact_id && entry.student_id == student_id)
        .ok_or_else(|| ApiError::NotFound("Queue entry not found".to_string()))?;
    let task = find_task(&tasks, entry.task_id).cloned();

    let mode = task.as_ref().map(|task| task.mode()).unwrap_or_default();
    let max_points = task.as_ref().and_then(|task| task.max_points);
    let threshold = task.as_ref().and_then(|task| task.pass_threshold);

    let first_submission = first_submission_at(&history);
    let lateness = lateness_percent(entry.soft_deadline, entry.hard_deadline, first_submission);
    let badge = LatenessBadge::evaluate(entry.last_submitted_at, lateness);

    let penalty = entry.penalty_percent_applied.unwrap_or_else(|| {
        first_submission
            .map(|submitted_at| {
                penalty_percent(
                    LatePolicy::from_settings(state.settings()),
                    entry.soft_deadline,
                    entry.hard_deadline,
                    submitted_at,
                )
            })
            .unwrap_or(0.0)
    });
    let brutto = entry.last_points_brutto;
    let preview = brutto.map(|points| netto_preview(points, penalty, mode, max_points));

    let counts = HashMap::from([((artifact_id, student_id), history.len())]);
    let item = annotate(&entry, task.as_ref(), &counts);

    history.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let grade_form = GradeFormDefaults {
        points: brutto,
        status_after_grade: match entry.last_revision_status {
            Some(RevisionStatus::NeedsFix) => RevisionStatus::NeedsFix,
            _ => RevisionStatus::Accepted,
        },
        points_ceiling: points_ceiling(mode, max_points),
    };

    Ok(Json(EntryDetailResponse {
        entry: item,
        history,
        first_submission_at: first_submission,
        lateness: LatenessView::new(badge, lateness),
        pass_threshold: threshold,
        meets_pass_threshold: brutto
            .and_then(|points| meets_pass_threshold(points, threshold, mode, max_points)),
        penalty_percent: penalty,
        netto_preview: preview,
        netto_preview_display: format_points(preview, mode, max_points),
        grade_form,
        task,
    }))
}

pub(super) async fn submit_grade(
    Path(course_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.status_after_grade == RevisionStatus::Submitted {
        return Err(ApiError::BadRequest(
            "status_after_grade must be NEEDS_FIX, ACCEPTED or REJECTED".to_string(),
        ));
    }

    let backend = state.backend();
    let (tasks, queue) = tokio::try_join!(
        backend.course_tasks(&teacher.token, course_id),
        backend.teacher_queue(&teacher.token, course_id),
    )?;

    let entry = queue
        .iter()
        .find(|entry| {
            entry.artifact_id == payload.artifact_id && entry.student_id == payload.student_id
        })
        .ok_or_else(|| ApiError::NotFound("Queue entry not found".to_string()))?;

    let Some(revision_id) = entry.last_revision_id else {
        return Err(ApiError::Conflict(
            "No revision to grade; the student has not submitted yet".to_string(),
        ));
    };
    if !can_grade(entry.last_revision_id, entry.last_revision_status) {
        return Err(ApiError::Conflict("Revision is waiting for the student's correction".to_string()));
    }

    let current = entry.last_revision_status.unwrap_or(RevisionStatus::Submitted);
    if !status_transition_allowed(current, payload.status_after_grade) {
        return Err(ApiError::Conflict(format!(
            "Status cannot change from {} to {}",
            current.as_str(),
            payload.status_after_grade.as_str()
        )));
    }

    let task = find_task(&tasks, entry.task_id);
    let mode = task.map(|task| task.mode()).unwrap_or_default();
    let max_points = task.and_then(|task| task.max_points);
    let threshold = task.and_then(|task| task.pass_threshold);

    validate_points(payload.points, mode, max_points)?;

    let below = below_pass_warning(payload.points, payload.status_after_grade, threshold);
    if below && !payload.confirm_below_threshold {
        return Err(ApiError::Conflict(
            "Accepting below the pass threshold requires confirm_below_threshold".to_string(),
        ));
    }

    let comment = payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let grade = backend
        .grade_revision(
            &teacher.token,
            &GradeRevisionRequest {
                revision_id,
                points: payload.points,
                comment: comment.map(str::to_string),
                status_after_grade: payload.status_after_grade,
                skip_penalty: true,
            },
        )
        .await?;

    tracing::info!(
        course_id,
        revision_id,
        teacher_id = teacher.profile.id,
        status = payload.status_after_grade.as_str(),
        below_threshold = below,
        "Grade submitted"
    );

    Ok(Json(GradeResponse {
        revision_id,
        status_after_grade: payload.status_after_grade,
        points: payload.points,
        points_display: format_points(Some(payload.points), mode, max_points),
        below_pass_threshold: below,
        grade,
    }))
}

pub(super) async fn upload_feedback(
    Path(revision_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FeedbackUploadResponse>, ApiError> {
    let form = read_upload_form(multipart, state.settings()).await?;

    let stored =
        store_via_presign(state.backend(), &teacher.token, REVISION_FEEDBACK_PREFIX, form.file)
            .await?;

    let material = state
        .backend()
        .add_feedback_material(
            &teacher.token,
            revision_id,
            &FeedbackMaterialRequest {
                file_key: stored.file_key.clone(),
                original_file_name: stored.original_file_name.clone(),
            },
        )
        .await?;

    tracing::info!(revision_id, file_key = %stored.file_key, "Feedback material attached");

    Ok(Json(FeedbackUploadResponse {
        revision_id,
        file_key: stored.file_key,
        original_file_name: stored.original_file_name,
        size_bytes: stored.size_bytes,
        material,
    }))
}
