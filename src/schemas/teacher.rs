use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::schemas::backend::{ClassGroup, QueueEntry, RevisionRecord, TaskDto};
use crate::schemas::types::{GradingMode, RevisionStatus};
use crate::schemas::LatenessView;

#[derive(Debug, Serialize)]
pub(crate) struct ClassGroupsResponse {
    pub(crate) groups: Vec<ClassGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TasksQuery {
    #[serde(default)]
    pub(crate) session: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TasksResponse {
    pub(crate) tasks: Vec<TaskDto>,
    pub(crate) session_options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueQuery {
    #[serde(default)]
    pub(crate) task_id: Option<i64>,
    #[serde(default)]
    pub(crate) session: Option<String>,
    #[serde(default)]
    pub(crate) artifact_id: Option<i64>,
    #[serde(default)]
    pub(crate) student_id: Option<i64>,
}

/// A queue entry with everything the grading table shows next to it.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QueueItem {
    #[serde(flatten)]
    pub(crate) entry: QueueEntry,
    pub(crate) stage: usize,
    pub(crate) status_label: &'static str,
    pub(crate) can_grade: bool,
    pub(crate) grading_mode: GradingMode,
    pub(crate) points_display: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueueResponse {
    pub(crate) submitted: Vec<QueueItem>,
    pub(crate) waiting: Vec<QueueItem>,
    pub(crate) selected: Option<QueueItem>,
    pub(crate) session_options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeFormDefaults {
    pub(crate) points: Option<f64>,
    pub(crate) status_after_grade: RevisionStatus,
    pub(crate) points_ceiling: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct EntryDetailResponse {
    pub(crate) entry: QueueItem,
    pub(crate) task: Option<TaskDto>,
    /// Newest revision first.
    pub(crate) history: Vec<RevisionRecord>,
    #[serde(with = "crate::core::time::flexible")]
    pub(crate) first_submission_at: Option<OffsetDateTime>,
    pub(crate) lateness: LatenessView,
    pub(crate) pass_threshold: Option<f64>,
    pub(crate) meets_pass_threshold: Option<bool>,
    pub(crate) penalty_percent: f64,
    pub(crate) netto_preview: Option<f64>,
    pub(crate) netto_preview_display: String,
    pub(crate) grade_form: GradeFormDefaults,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    pub(crate) artifact_id: i64,
    pub(crate) student_id: i64,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    #[validate(length(max = 4000, message = "comment must be at most 4000 characters"))]
    pub(crate) comment: Option<String>,
    pub(crate) status_after_grade: RevisionStatus,
    #[serde(default)]
    pub(crate) confirm_below_threshold: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) revision_id: i64,
    pub(crate) status_after_grade: RevisionStatus,
    pub(crate) points: f64,
    pub(crate) points_display: String,
    pub(crate) below_pass_threshold: bool,
    pub(crate) grade: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackUploadResponse {
    pub(crate) revision_id: i64,
    pub(crate) file_key: String,
    pub(crate) original_file_name: String,
    pub(crate) size_bytes: i64,
    pub(crate) material: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    pub(crate) anonymize: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grade_request_validation() {
        let request: GradeRequest = serde_json::from_value(json!({
            "artifact_id": 1,
            "student_id": 2,
            "points": -1.0,
            "status_after_grade": "ACCEPTED"
        }))
        .expect("grade request");

        assert!(!request.confirm_below_threshold);
        assert!(request.validate().is_err());

        let long_comment = GradeRequest {
            points: 3.0,
            comment: Some("x".repeat(4001)),
            ..request
        };
        assert!(long_comment.validate().is_err());
    }

    #[test]
    fn queue_item_flattens_entry_fields() {
        let entry: QueueEntry = serde_json::from_value(json!({
            "artifactId": 4,
            "taskId": 2,
            "studentId": 9,
            "lastRevisionStatus": "SUBMITTED"
        }))
        .expect("entry");
        let item = QueueItem {
            entry,
            stage: 2,
            status_label: "Złożone (oczekuje)",
            can_grade: true,
            grading_mode: GradingMode::Percent,
            points_display: "brak".to_string(),
        };

        let value = serde_json::to_value(&item).expect("json");
        assert_eq!(value["artifact_id"], 4);
        assert_eq!(value["last_revision_status"], "SUBMITTED");
        assert_eq!(value["stage"], 2);
    }
}
