use std::collections::HashMap;

use serde::Serialize;

use crate::services::evaluator::LatenessBadge;

pub(crate) mod backend;
pub(crate) mod notification;
pub(crate) mod stats;
pub(crate) mod student;
pub(crate) mod teacher;
pub(crate) mod types;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
    pub(crate) backend_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct LatenessView {
    pub(crate) code: &'static str,
    pub(crate) label: String,
    pub(crate) percent: Option<u8>,
}

impl LatenessView {
    pub(crate) fn new(badge: LatenessBadge, percent: Option<u8>) -> Self {
        Self { code: badge.code(), label: badge.label(), percent }
    }
}
