pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod notifications;
pub(crate) mod router;
pub(crate) mod stats;
pub(crate) mod student;
pub(crate) mod teacher;
pub(crate) mod uploads;
pub(crate) mod validation;
