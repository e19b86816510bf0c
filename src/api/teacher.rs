use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::schemas::backend::{QueueEntry, TaskDto};
use crate::schemas::teacher::{
    ClassGroupsResponse, QueueItem, QueueQuery, QueueResponse, TasksQuery, TasksResponse,
};
use crate::services::evaluator::{can_grade, format_points, stage_ordinal, status_label};
use crate::services::task_filters::{
    default_selection, filter_queue, filter_tasks, session_options, split_queue, SessionFilter,
};

mod exports;
mod grading;


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/class-groups", get(list_class_groups))
        .route("/courses/:course_id/tasks", get(list_tasks))
        .route("/courses/:course_id/queue", get(grading_queue))
        .route("/courses/:course_id/queue/:artifact_id/:student_id", get(grading::entry_detail))
        .route("/courses/:course_id/grades", post(grading::submit_grade))
        .route("/courses/:course_id/exports/:kind", get(exports::download_export))
        .route("/revisions/:revision_id/feedback", post(grading::upload_feedback))
}

/// Decorates a queue entry with the values shown in the grading table.
fn annotate(
    entry: &QueueEntry,
    task: Option<&TaskDto>,
    revision_counts: &HashMap<(i64, i64), usize>,
) -> QueueItem {
    let mode = task.map(TaskDto::mode).unwrap_or_default();
    let max_points = task.and_then(|task| task.max_points);
    let count = revision_counts
        .get(&(entry.artifact_id, entry.student_id))
        .copied()
        .unwrap_or_default();

    QueueItem {
        entry: entry.clone(),
        stage: stage_ordinal(count),
        status_label: status_label(entry.last_revision_status),
        can_grade: can_grade(entry.last_revision_id, entry.last_revision_status),
        grading_mode: mode,
        points_display: format_points(entry.last_points_brutto, mode, max_points),
    }
}

fn find_task(tasks: &[TaskDto], task_id: i64) -> Option<&TaskDto> {
    tasks.iter().find(|task| task.id == task_id)
}

async fn list_class_groups(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ClassGroupsResponse>, ApiError> {
    let groups = state.backend().class_groups(&teacher.token).await?;
    Ok(Json(ClassGroupsResponse { groups }))
}

async fn list_tasks(
    Path(course_id): Path<i64>,
    Query(query): Query<TasksQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TasksResponse>, ApiError> {
    let tasks = state.backend().course_tasks(&teacher.token, course_id).await?;

    let options = session_options(tasks.iter().map(|task| task.session_name.as_deref()));
    let session = SessionFilter::parse(query.session.as_deref());
    let filtered = filter_tasks(&tasks, &session).into_iter().cloned().collect();

    Ok(Json(TasksResponse { tasks: filtered, session_options: options }))
}

async fn grading_queue(
    Path(course_id): Path<i64>,
    Query(query): Query<QueueQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<QueueResponse>, ApiError> {
    let backend = state.backend();
    let (tasks, queue) = tokio::try_join!(
        backend.course_tasks(&teacher.token, course_id),
        backend.teacher_queue(&teacher.token, course_id),
    )?;

    let session = SessionFilter::parse(query.session.as_deref());
    let visible_tasks: Option<HashSet<i64>> = match session {
        SessionFilter::All => None,
        _ => Some(filter_tasks(&tasks, &session).into_iter().map(|task| task.id).collect()),
    };
    let entries = filter_queue(&queue, query.task_id, visible_tasks.as_ref());

    let mut seen = HashSet::new();
    let pairs: Vec<(i64, i64)> = entries
        .iter()
        .map(|entry| (entry.artifact_id, entry.student_id))
        .filter(|pair| seen.insert(*pair))
        .collect();
    let counts = backend.revision_counts(&teacher.token, &pairs).await;

    let annotate_all = |entries: &[&QueueEntry]| -> Vec<QueueItem> {
        entries
            .iter()
            .map(|entry| annotate(entry, find_task(&tasks, entry.task_id), &counts))
            .collect()
    };

    let (submitted, waiting) = split_queue(&entries);
    let preferred = query.artifact_id.zip(query.student_id);
    let selected = default_selection(&entries, preferred)
        .map(|entry| annotate(entry, find_task(&tasks, entry.task_id), &counts));

    tracing::debug!(
        course_id,
        submitted = submitted.len(),
        waiting = waiting.len(),
        "Grading queue assembled"
    );

    Ok(Json(QueueResponse {
        submitted: annotate_all(&submitted),
        waiting: annotate_all(&waiting),
        selected,
        session_options: session_options(tasks.iter().map(|task| task.session_name.as_deref())),
    }))
}
