pub(crate) mod backend;
pub(crate) mod evaluator;
pub(crate) mod late_penalty;
pub(crate) mod notification_reads;
pub(crate) mod notifications;
pub(crate) mod session_summary;
pub(crate) mod task_filters;
pub(crate) mod uploads;
