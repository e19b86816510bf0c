//! Notifications derived from the queue (teachers) and the overview (students).
//!
//! Nothing is stored except which ids a user has already seen. Ids are built
//! from the kind and the submission they point at, so editing the wording of a
//! message never resurfaces an old notification.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::schemas::backend::{QueueEntry, StudentTaskView};
use crate::schemas::types::RevisionStatus;
use crate::services::evaluator::stage_ordinal;

const UNKNOWN_STUDENT: &str = "Studenta";
const UNKNOWN_TASK: &str = "Zadanie";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum NotificationKind {
    Submission,
    NewTask,
    Feedback,
    Accepted,
}

impl NotificationKind {
    fn slug(self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::NewTask => "new-task",
            Self::Feedback => "feedback",
            Self::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Notification {
    pub(crate) id: String,
    pub(crate) kind: NotificationKind,
    pub(crate) message: String,
    pub(crate) artifact_id: i64,
    pub(crate) task_id: i64,
}

fn notification_id(
    kind: NotificationKind,
    artifact_id: i64,
    student_id: i64,
    revision: Option<String>,
) -> String {
    let revision = revision.unwrap_or_else(|| "-".to_string());
    format!("{}:{artifact_id}:{student_id}:{revision}", kind.slug())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// One notification per queue entry waiting for a grade.
pub(crate) fn for_teacher(
    queue: &[QueueEntry],
    revision_counts: &HashMap<(i64, i64), usize>,
) -> Vec<Notification> {
    queue
        .iter()
        .filter(|entry| entry.last_revision_status == Some(RevisionStatus::Submitted))
        .map(|entry| {
            let count = revision_counts
                .get(&(entry.artifact_id, entry.student_id))
                .copied()
                .unwrap_or_default();
            let student = non_empty(entry.student_name.as_deref()).unwrap_or(UNKNOWN_STUDENT);
            let task = non_empty(entry.task_title.as_deref()).unwrap_or_default();

            Notification {
                id: notification_id(
                    NotificationKind::Submission,
                    entry.artifact_id,
                    entry.student_id,
                    entry.last_revision_id.map(|id| id.to_string()),
                ),
                kind: NotificationKind::Submission,
                message: format!(
                    "Nowe oddanie od {student} do zadania {task} (Etap {})",
                    stage_ordinal(count)
                ),
                artifact_id: entry.artifact_id,
                task_id: entry.task_id,
            }
        })
        .collect()
}

/// New tasks, returned work and accepted work for one student.
///
/// The overview carries no revision id, so the submission time stands in for
/// it: a second round of corrections yields a fresh notification.
pub(crate) fn for_student(items: &[StudentTaskView], student_id: i64) -> Vec<Notification> {
    items
        .iter()
        .filter_map(|item| {
            let title = non_empty(item.task_title.as_deref());
            let (kind, message) = match item.last_revision_status {
                None if item.last_submitted_at.is_none() => {
                    let title = title
                        .or_else(|| non_empty(item.stage_name.as_deref()))
                        .unwrap_or(UNKNOWN_TASK);
                    (NotificationKind::NewTask, format!("Nowe zadanie: {title}"))
                }
                Some(RevisionStatus::NeedsFix) => (
                    NotificationKind::Feedback,
                    format!("Zadanie do poprawy: {}", title.unwrap_or(UNKNOWN_TASK)),
                ),
                Some(RevisionStatus::Accepted) => (
                    NotificationKind::Accepted,
                    format!("Zadanie zaakceptowane: {}", title.unwrap_or(UNKNOWN_TASK)),
                ),
                _ => return None,
            };

            Some(Notification {
                id: notification_id(
                    kind,
                    item.artifact_id,
                    student_id,
                    item.last_submitted_at.map(|at| at.unix_timestamp().to_string()),
                ),
                kind,
                message,
                artifact_id: item.artifact_id,
                task_id: item.task_id,
            })
        })
        .collect()
}

pub(crate) fn unread_ids(notifications: &[Notification], read: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    notifications
        .iter()
        .filter(|notification| !read.contains(&notification.id))
        .filter(|notification| seen.insert(notification.id.as_str()))
        .map(|notification| notification.id.clone())
        .collect()
}
