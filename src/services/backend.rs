//! Typed client for the grading backend.
//!
//! Every call forwards the caller's bearer token untouched; the backend is the
//! only place where identity and permissions are decided.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::core::{config::Settings, metrics};
use crate::schemas::backend::{
    ClassGroup, FeedbackMaterialRequest, GradeRevisionRequest, PresignRequest, PresignResponse,
    Profile, QueueEntry, RevisionRecord, StatsRow, StudentTaskView, SubmitRevisionRequest, TaskDto,
};
use crate::schemas::types::ExportKind;

#[derive(Debug, thiserror::Error)]
pub(crate) enum BackendError {
    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    #[error("object upload failed: {0}")]
    Upload(String),
}

impl BackendError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Upload(_) => "upload",
        }
    }
}

/// Raw export payload passed through to the caller.
#[derive(Debug)]
pub(crate) struct ExportPayload {
    pub(crate) bytes: Vec<u8>,
    pub(crate) content_type: Option<String>,
    pub(crate) content_disposition: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BackendClient {
    client: Client,
    base_url: String,
    lookups: Arc<Semaphore>,
}

impl BackendClient {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let backend = settings.backend();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(backend.connect_timeout_seconds))
            .timeout(Duration::from_secs(backend.timeout_seconds))
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            base_url: backend.base_url.trim_end_matches('/').to_string(),
            lookups: Arc::new(Semaphore::new(backend.max_parallel_lookups)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn profile(&self, token: &str) -> Result<Profile, BackendError> {
        let request = self.client.post(self.url("/api/auth/me")).bearer_auth(token);
        self.send_json("profile", request).await
    }

    pub(crate) async fn class_groups(&self, token: &str) -> Result<Vec<ClassGroup>, BackendError> {
        let request = self.client.get(self.url("/api/teacher/class-groups")).bearer_auth(token);
        self.send_json("class_groups", request).await
    }

    pub(crate) async fn course_tasks(
        &self,
        token: &str,
        course_id: i64,
    ) -> Result<Vec<TaskDto>, BackendError> {
        let request =
            self.client.get(self.url(&format!("/api/course/{course_id}/tasks"))).bearer_auth(token);
        self.send_json("course_tasks", request).await
    }

    pub(crate) async fn teacher_queue(
        &self,
        token: &str,
        course_id: i64,
    ) -> Result<Vec<QueueEntry>, BackendError> {
        let request = self
            .client
            .get(self.url("/api/grading-queue/teacher"))
            .query(&[("courseId", course_id)])
            .bearer_auth(token);
        self.send_json("teacher_queue", request).await
    }

    pub(crate) async fn revision_history(
        &self,
        token: &str,
        artifact_id: i64,
        student_id: i64,
    ) -> Result<Vec<RevisionRecord>, BackendError> {
        let path = format!("/api/revisions/artifact/{artifact_id}/student/{student_id}");
        let request = self.client.get(self.url(&path)).bearer_auth(token);
        self.send_json("revision_history", request).await
    }

    pub(crate) async fn own_revision_history(
        &self,
        token: &str,
        artifact_id: i64,
    ) -> Result<Vec<RevisionRecord>, BackendError> {
        let path = format!("/api/revisions/artifact/{artifact_id}/me");
        let request = self.client.get(self.url(&path)).bearer_auth(token);
        self.send_json("own_revision_history", request).await
    }

    /// Revision counts for many `(artifact, student)` pairs, at most
    /// `BACKEND_MAX_PARALLEL_LOOKUPS` in flight. A failed lookup counts as zero.
    pub(crate) async fn revision_counts(
        &self,
        token: &str,
        pairs: &[(i64, i64)],
    ) -> HashMap<(i64, i64), usize> {
        let mut handles = Vec::with_capacity(pairs.len());
        for &(artifact_id, student_id) in pairs {
            let client = self.clone();
            let token = token.to_string();
            let semaphore = self.lookups.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = client.revision_history(&token, artifact_id, student_id).await;
                ((artifact_id, student_id), result)
            }));
        }

        let mut counts = HashMap::with_capacity(pairs.len());
        for handle in handles {
            match handle.await {
                Ok((key, Ok(history))) => {
                    counts.insert(key, history.len());
                }
                Ok((key, Err(err))) => {
                    tracing::warn!(
                        artifact_id = key.0,
                        student_id = key.1,
                        error = %err,
                        "Revision count lookup failed; falling back to first stage"
                    );
                    counts.insert(key, 0);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Revision count lookup task aborted");
                }
            }
        }
        counts
    }

    pub(crate) async fn student_courses(
        &self,
        token: &str,
    ) -> Result<Vec<ClassGroup>, BackendError> {
        let request = self.client.get(self.url("/api/student/courses")).bearer_auth(token);
        self.send_json("student_courses", request).await
    }

    pub(crate) async fn student_overview(
        &self,
        token: &str,
        course_id: i64,
    ) -> Result<Vec<StudentTaskView>, BackendError> {
        let path = format!("/api/student/courses/{course_id}/overview");
        let request = self.client.get(self.url(&path)).bearer_auth(token);
        self.send_json("student_overview", request).await
    }

    pub(crate) async fn presign(
        &self,
        token: &str,
        prefix: &str,
        original_file_name: &str,
    ) -> Result<PresignResponse, BackendError> {
        let request = self
            .client
            .post(self.url("/api/storage/presign"))
            .bearer_auth(token)
            .json(&PresignRequest { prefix, original_file_name });
        self.send_json("presign", request).await
    }

    /// Object upload to a presigned URL. The URL itself is the credential, so
    /// no bearer token is attached.
    pub(crate) async fn upload_object(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), BackendError> {
        let url = reqwest::Url::parse(upload_url)
            .map_err(|err| BackendError::InvalidUrl(format!("{upload_url}: {err}")))?;
        let mut request = self.client.put(url).body(bytes);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        // presigned URLs carry their own credentials; any refusal is a storage failure
        match self.send_bytes("upload_object", request).await {
            Ok(_) => Ok(()),
            Err(BackendError::Status { status, body }) => Err(BackendError::Upload(format!(
                "object store responded with status {status}: {body}"
            ))),
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn submit_revision(
        &self,
        token: &str,
        body: &SubmitRevisionRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.post_json("submit_revision", token, "/api/revisions", body).await
    }

    pub(crate) async fn grade_revision(
        &self,
        token: &str,
        body: &GradeRevisionRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.post_json("grade_revision", token, "/api/grades", body).await
    }

    pub(crate) async fn add_feedback_material(
        &self,
        token: &str,
        revision_id: i64,
        body: &FeedbackMaterialRequest,
    ) -> Result<serde_json::Value, BackendError> {
        let path = format!("/api/revisions/{revision_id}/feedback-materials");
        self.post_json("feedback_material", token, &path, body).await
    }

    pub(crate) async fn export(
        &self,
        token: &str,
        course_id: i64,
        kind: ExportKind,
        anonymize: bool,
    ) -> Result<ExportPayload, BackendError> {
        let request = match kind {
            ExportKind::CsvDetailed => self
                .client
                .get(self.url(&format!("/api/export/course/{course_id}/csv-detailed"))),
            ExportKind::CsvAggregated => self
                .client
                .get(self.url(&format!("/api/export/course/{course_id}/csv-aggregated"))),
            ExportKind::Archive => self
                .client
                .get(self.url(&format!("/api/archive/course/{course_id}")))
                .query(&[("anonymize", anonymize)]),
        };

        let (headers, bytes) = self.send_bytes("export", request.bearer_auth(token)).await?;
        Ok(ExportPayload {
            bytes,
            content_type: header_string(&headers, CONTENT_TYPE.as_str()),
            content_disposition: header_string(&headers, CONTENT_DISPOSITION.as_str()),
        })
    }

    pub(crate) async fn stats_overview(&self, token: &str) -> Result<Vec<StatsRow>, BackendError> {
        let request = self.client.get(self.url("/api/stats/overview")).bearer_auth(token);
        self.send_json("stats_overview", request).await
    }

    pub(crate) async fn health(&self) -> Result<(), BackendError> {
        let request = self.client.get(self.url("/api/health"));
        self.send_bytes("health", request).await.map(|_| ())
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let request = self.client.post(self.url(path)).bearer_auth(token).json(body);
        self.send_json(operation, request).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let started = Instant::now();
        let result = self.execute(request).await.and_then(|(_, bytes)| decode_body(&bytes));
        observe(operation, started, &result);
        result
    }

    async fn send_bytes(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<(HeaderMap, Vec<u8>), BackendError> {
        let started = Instant::now();
        let result = self.execute(request).await;
        observe(operation, started, &result);
        result
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(HeaderMap, Vec<u8>), BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?.to_vec();

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: extract_error_message(&bytes),
            });
        }

        Ok((headers, bytes))
    }
}

fn observe<T>(operation: &'static str, started: Instant, result: &Result<T, BackendError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };
    metrics::record_backend_call(operation, outcome, started.elapsed().as_secs_f64());
    if let Err(err) = result {
        tracing::debug!(operation, error = %err, "Backend call failed");
    }
}

/// An empty body decodes as JSON `null`, so write endpoints answering `204`
/// still produce a value.
fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BackendError> {
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) { b"null" } else { bytes };
    serde_json::from_slice(bytes).map_err(|err| BackendError::Decode(err.to_string()))
}

fn extract_error_message(bytes: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        for key in ["message", "detail", "error"] {
            if let Some(message) = value.get(key).and_then(serde_json::Value::as_str) {
                return message.to_string();
            }
        }
    }

    let text = String::from_utf8_lossy(bytes).trim().to_string();
    if text.chars().count() > 500 {
        text.chars().take(500).collect()
    } else {
        text
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}
