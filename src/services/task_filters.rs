//! Session, status and queue filters shared by the teacher and student views.

use std::collections::HashSet;

use crate::schemas::backend::{QueueEntry, StudentTaskView, TaskDto};
use crate::schemas::types::RevisionStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionFilter {
    All,
    /// Tasks that belong to no session.
    Single,
    Named(String),
}

impl SessionFilter {
    pub(crate) fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("ALL") => Self::All,
            Some("SINGLE") => Self::Single,
            Some(name) => Self::Named(name.to_string()),
        }
    }

    pub(crate) fn matches(&self, session_name: Option<&str>) -> bool {
        let session_name = session_name.filter(|name| !name.trim().is_empty());
        match self {
            Self::All => true,
            Self::Single => session_name.is_none(),
            Self::Named(name) => session_name == Some(name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusFilter {
    All,
    Done,
    Failed,
    Todo,
    Fix,
}

impl StatusFilter {
    pub(crate) fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).unwrap_or("ALL") {
            "" | "ALL" => Some(Self::All),
            "DONE" => Some(Self::Done),
            "FAILED" => Some(Self::Failed),
            "TODO" => Some(Self::Todo),
            "FIX" => Some(Self::Fix),
            _ => None,
        }
    }

    pub(crate) fn matches(self, item: &StudentTaskView) -> bool {
        let status = item.last_revision_status;
        match self {
            Self::All => true,
            Self::Done => status == Some(RevisionStatus::Accepted),
            Self::Failed => status == Some(RevisionStatus::Rejected),
            Self::Fix => status == Some(RevisionStatus::NeedsFix),
            Self::Todo => item.last_submitted_at.is_none(),
        }
    }
}

/// Distinct session names in order of first appearance.
pub(crate) fn session_options<'a>(names: impl IntoIterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

pub(crate) fn filter_tasks<'a>(tasks: &'a [TaskDto], session: &SessionFilter) -> Vec<&'a TaskDto> {
    tasks.iter().filter(|task| session.matches(task.session_name.as_deref())).collect()
}

pub(crate) fn filter_overview<'a>(
    items: &'a [StudentTaskView],
    session: &SessionFilter,
    status: StatusFilter,
) -> Vec<&'a StudentTaskView> {
    items
        .iter()
        .filter(|item| session.matches(item.session_name.as_deref()))
        .filter(|item| status.matches(item))
        .collect()
}

/// Queue entries restricted to one task, or to the tasks a session filter keeps.
pub(crate) fn filter_queue<'a>(
    queue: &'a [QueueEntry],
    task_id: Option<i64>,
    visible_tasks: Option<&HashSet<i64>>,
) -> Vec<&'a QueueEntry> {
    queue
        .iter()
        .filter(|entry| task_id.map_or(true, |task_id| entry.task_id == task_id))
        .filter(|entry| visible_tasks.map_or(true, |tasks| tasks.contains(&entry.task_id)))
        .collect()
}

/// Splits entries into those with a submission and those still waiting for one.
pub(crate) fn split_queue<'a>(
    entries: &[&'a QueueEntry],
) -> (Vec<&'a QueueEntry>, Vec<&'a QueueEntry>) {
    entries.iter().copied().partition(|entry| entry.last_submitted_at.is_some())
}

/// The preferred `(artifact, student)` pair if present, else the first
/// submitted entry, else the first entry.
pub(crate) fn default_selection<'a>(
    entries: &[&'a QueueEntry],
    preferred: Option<(i64, i64)>,
) -> Option<&'a QueueEntry> {
    preferred
        .and_then(|(artifact_id, student_id)| {
            entries
                .iter()
                .find(|entry| entry.artifact_id == artifact_id && entry.student_id == student_id)
        })
        .or_else(|| entries.iter().find(|entry| entry.last_submitted_at.is_some()))
        .or_else(|| entries.first())
        .copied()
}
