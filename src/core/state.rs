use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::backend::BackendClient;
use crate::services::notification_reads::ReadMarkerStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    backend: BackendClient,
    redis: RedisHandle,
    read_markers: ReadMarkerStore,
}

impl AppState {
    pub(crate) fn new(settings: Settings, backend: BackendClient, redis: RedisHandle) -> Self {
        let ttl_seconds = settings.notifications().read_ttl_days.saturating_mul(24 * 60 * 60);
        let read_markers = ReadMarkerStore::new(redis.clone(), ttl_seconds);
        Self { inner: Arc::new(InnerState { settings, backend, redis, read_markers }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn read_markers(&self) -> &ReadMarkerStore {
        &self.inner.read_markers
    }
}
