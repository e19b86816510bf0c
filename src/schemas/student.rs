use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::schemas::backend::{ClassGroup, RevisionRecord, StudentTaskView};
use crate::schemas::types::RevisionStatus;
use crate::schemas::LatenessView;
use crate::services::session_summary::SessionSummary;

#[derive(Debug, Serialize)]
pub(crate) struct CoursesResponse {
    pub(crate) courses: Vec<ClassGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverviewQuery {
    #[serde(default)]
    pub(crate) session: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OverviewItem {
    #[serde(flatten)]
    pub(crate) task: StudentTaskView,
    pub(crate) status_label: &'static str,
    pub(crate) can_resubmit: bool,
    pub(crate) points_display: String,
    pub(crate) meets_pass_threshold: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OverviewResponse {
    pub(crate) items: Vec<OverviewItem>,
    pub(crate) sessions: Vec<SessionSummary>,
    pub(crate) session_options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    pub(crate) course_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryResponse {
    pub(crate) artifact_id: i64,
    /// Newest revision first.
    pub(crate) history: Vec<RevisionRecord>,
    pub(crate) stage: usize,
    #[serde(with = "crate::core::time::flexible")]
    pub(crate) first_submission_at: Option<OffsetDateTime>,
    pub(crate) latest_status: Option<RevisionStatus>,
    pub(crate) status_label: &'static str,
    pub(crate) can_resubmit: bool,
    /// Present when `course_id` was given and the task has deadlines.
    pub(crate) lateness: Option<LatenessView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitRevisionResponse {
    pub(crate) artifact_id: i64,
    pub(crate) file_key: String,
    pub(crate) original_file_name: String,
    pub(crate) size_bytes: i64,
    pub(crate) revision: serde_json::Value,
}
