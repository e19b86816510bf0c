use serde::{Deserialize, Serialize};

use crate::services::notifications::Notification;

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationsQuery {
    #[serde(default)]
    pub(crate) course_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NotificationItem {
    #[serde(flatten)]
    pub(crate) notification: Notification,
    pub(crate) read: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct NotificationsResponse {
    pub(crate) items: Vec<NotificationItem>,
    pub(crate) unread_count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkReadResponse {
    pub(crate) marked: usize,
}
