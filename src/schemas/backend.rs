//! Wire shapes of the grading backend.
//!
//! Reads accept the backend's camelCase JSON and re-serialize in snake_case like
//! every other response of this service; request bodies stay camelCase.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::schemas::types::{GradingMode, RevisionStatus, UserRole};
use crate::services::evaluator::Submitted;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct Profile {
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    pub(crate) last_name: Option<String>,
    pub(crate) role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct ClassGroup {
    pub(crate) id: i64,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) student_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) teacher_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct TaskDto {
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) course_id: Option<i64>,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) start_date: Option<OffsetDateTime>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) session_id: Option<i64>,
    #[serde(default)]
    pub(crate) session_name: Option<String>,
    #[serde(default)]
    pub(crate) grading_mode: Option<GradingMode>,
    #[serde(default)]
    pub(crate) max_points: Option<f64>,
    #[serde(default)]
    pub(crate) pass_threshold: Option<f64>,
}

impl TaskDto {
    pub(crate) fn mode(&self) -> GradingMode {
        self.grading_mode.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct QueueEntry {
    pub(crate) artifact_id: i64,
    #[serde(default)]
    pub(crate) stage_id: Option<i64>,
    pub(crate) task_id: i64,
    #[serde(default)]
    pub(crate) course_id: Option<i64>,
    pub(crate) student_id: i64,
    #[serde(default)]
    pub(crate) album_number: Option<String>,
    #[serde(default)]
    pub(crate) student_name: Option<String>,
    #[serde(default)]
    pub(crate) task_title: Option<String>,
    #[serde(default)]
    pub(crate) stage_name: Option<String>,
    #[serde(default)]
    pub(crate) artifact_name: Option<String>,
    #[serde(default)]
    pub(crate) last_revision_id: Option<i64>,
    #[serde(default)]
    pub(crate) last_revision_status: Option<RevisionStatus>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) last_submitted_at: Option<OffsetDateTime>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) soft_deadline: Option<OffsetDateTime>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) hard_deadline: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) penalty_percent_applied: Option<f64>,
    #[serde(default)]
    pub(crate) last_points_brutto: Option<f64>,
    #[serde(default)]
    pub(crate) last_points_netto: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct RevisionGrade {
    #[serde(default)]
    pub(crate) grade_id: Option<i64>,
    #[serde(default)]
    pub(crate) teacher_id: Option<i64>,
    #[serde(default)]
    pub(crate) points_brutto: Option<f64>,
    #[serde(default)]
    pub(crate) points_netto: Option<f64>,
    #[serde(default)]
    pub(crate) comment: Option<String>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) status_after_grade: Option<RevisionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct FeedbackMaterial {
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) original_file_name: Option<String>,
    #[serde(default)]
    pub(crate) download_url: Option<String>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct RevisionRecord {
    pub(crate) revision_id: i64,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) status: Option<RevisionStatus>,
    #[serde(default)]
    pub(crate) original_file_name: Option<String>,
    #[serde(default)]
    pub(crate) size_bytes: Option<i64>,
    #[serde(default)]
    pub(crate) comment: Option<String>,
    #[serde(default)]
    pub(crate) download_url: Option<String>,
    #[serde(default)]
    pub(crate) grades: Vec<RevisionGrade>,
    #[serde(default)]
    pub(crate) feedback_materials: Vec<FeedbackMaterial>,
}

impl Submitted for RevisionRecord {
    fn submitted_at(&self) -> Option<OffsetDateTime> {
        self.created_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct StudentTaskView {
    pub(crate) task_id: i64,
    #[serde(default)]
    pub(crate) task_title: Option<String>,
    #[serde(default)]
    pub(crate) task_description: Option<String>,
    #[serde(default)]
    pub(crate) session_id: Option<i64>,
    #[serde(default)]
    pub(crate) session_name: Option<String>,
    #[serde(default)]
    pub(crate) stage_id: Option<i64>,
    #[serde(default)]
    pub(crate) stage_name: Option<String>,
    #[serde(default)]
    pub(crate) stage_weight_percent: Option<i32>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) soft_deadline: Option<OffsetDateTime>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) hard_deadline: Option<OffsetDateTime>,
    pub(crate) artifact_id: i64,
    #[serde(default)]
    pub(crate) artifact_name: Option<String>,
    #[serde(default)]
    pub(crate) grading_mode: Option<GradingMode>,
    #[serde(default)]
    pub(crate) last_revision_status: Option<RevisionStatus>,
    #[serde(default, with = "crate::core::time::flexible")]
    pub(crate) last_submitted_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) last_points_netto: Option<f64>,
    #[serde(default)]
    pub(crate) days_until_soft: Option<i32>,
    #[serde(default)]
    pub(crate) days_overdue: Option<i32>,
    #[serde(default)]
    pub(crate) materials: Vec<serde_json::Value>,
    #[serde(default)]
    pub(crate) max_points: Option<f64>,
    #[serde(default)]
    pub(crate) pass_threshold: Option<f64>,
}

impl StudentTaskView {
    pub(crate) fn mode(&self) -> GradingMode {
        self.grading_mode.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct StatsRow {
    pub(crate) task_id: i64,
    #[serde(default)]
    pub(crate) task_title: Option<String>,
    #[serde(default)]
    pub(crate) course_id: Option<i64>,
    #[serde(default)]
    pub(crate) course_name: Option<String>,
    pub(crate) passed: u64,
    pub(crate) failed: u64,
    pub(crate) pending: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresignRequest<'a> {
    pub(crate) prefix: &'a str,
    pub(crate) original_file_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresignResponse {
    pub(crate) file_key: String,
    pub(crate) upload_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitRevisionRequest {
    pub(crate) artifact_id: i64,
    pub(crate) file_key: String,
    pub(crate) original_file_name: String,
    pub(crate) mime_type: Option<String>,
    pub(crate) size_bytes: Option<i64>,
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GradeRevisionRequest {
    pub(crate) revision_id: i64,
    pub(crate) points: f64,
    pub(crate) comment: Option<String>,
    pub(crate) status_after_grade: RevisionStatus,
    pub(crate) skip_penalty: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedbackMaterialRequest {
    pub(crate) file_key: String,
    pub(crate) original_file_name: String,
}
