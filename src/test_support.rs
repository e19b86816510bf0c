use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, state::AppState};
use crate::services::backend::BackendClient;

pub(crate) const TEACHER_TOKEN: &str = "teacher-token";
pub(crate) const STUDENT_TOKEN: &str = "student-token";
pub(crate) const COURSE_ID: i64 = 1;

const MULTIPART_BOUNDARY: &str = "grading-desk-test-boundary";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) backend: FakeBackend,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env(backend_url: &str) {
    std::env::set_var("GRADING_DESK_ENV", "test");
    std::env::set_var("GRADING_DESK_STRICT_CONFIG", "0");
    std::env::set_var("BACKEND_API_URL", backend_url);
    std::env::set_var("BACKEND_MAX_PARALLEL_LOOKUPS", "4");
    std::env::set_var("BACKEND_TIMEOUT_SECONDS", "5");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    // Nothing listens on port 1, so Redis stays disconnected.
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("REDIS_PORT", "1");
    std::env::remove_var("REDIS_PASSWORD");
    std::env::set_var("MAX_UPLOAD_SIZE_MB", "1");
    for key in [
        "API_PREFIX",
        "PROJECT_NAME",
        "ALLOWED_UPLOAD_EXTENSIONS",
        "BACKEND_CORS_ORIGINS",
        "LATE_PENALTY_PERCENT_PER_DAY",
        "LATE_PENALTY_MAX_PERCENT",
        "LATE_PENALTY_ALLOW_AFTER_HARD",
    ] {
        std::env::remove_var(key);
    }
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    let backend = FakeBackend::spawn().await;
    set_test_env(&backend.base_url);

    let settings = Settings::load().expect("settings");
    let client = BackendClient::from_settings(&settings).expect("backend client");
    let redis = RedisHandle::new(settings.redis().redis_url());

    let state = AppState::new(settings, client, redis);
    let app = api::router::router(state.clone());

    TestContext { state, app, backend, _guard: guard }
}

/// In-process stand-in for the grading backend, serving one course.
#[derive(Clone)]
pub(crate) struct FakeBackend {
    pub(crate) base_url: String,
    uploads: Arc<Mutex<Vec<(String, usize)>>>,
    fail_history: Arc<AtomicBool>,
}

impl FakeBackend {
    async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let backend = Self {
            base_url: format!("http://{addr}"),
            uploads: Arc::new(Mutex::new(Vec::new())),
            fail_history: Arc::new(AtomicBool::new(false)),
        };

        let app = Router::new()
            .route("/api/health", get(|| async { "OK" }))
            .route("/api/auth/me", post(fake_profile))
            .route("/api/teacher/class-groups", get(fake_class_groups))
            .route("/api/course/:course_id/tasks", get(fake_tasks))
            .route("/api/grading-queue/teacher", get(fake_queue))
            .route("/api/revisions/artifact/:artifact_id/student/:student_id", get(fake_history))
            .route("/api/revisions/artifact/:artifact_id/me", get(fake_own_history))
            .route("/api/student/courses", get(fake_student_courses))
            .route("/api/student/courses/:course_id/overview", get(fake_overview))
            .route("/api/storage/presign", post(fake_presign))
            .route("/upload/*key", put(fake_upload))
            .route("/api/revisions", post(fake_submit_revision))
            .route("/api/revisions/:revision_id/feedback-materials", post(fake_feedback))
            .route("/api/grades", post(fake_grade))
            .route("/api/export/course/:course_id/:kind", get(fake_csv_export))
            .route("/api/archive/course/:course_id", get(fake_archive))
            .route("/api/stats/overview", get(fake_stats))
            .with_state(backend.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        backend
    }

    /// Object keys and sizes received on presigned upload URLs.
    pub(crate) fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().expect("uploads lock").clone()
    }

    /// Makes every teacher-side revision history lookup answer 500.
    pub(crate) fn fail_history_lookups(&self) {
        self.fail_history.store(true, Ordering::SeqCst);
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" }))).into_response()
}

fn course_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Course not found" }))).into_response()
}

async fn fake_profile(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(TEACHER_TOKEN) => Json(json!({
            "id": 7,
            "email": "ewa.nowak@example.edu",
            "firstName": "Ewa",
            "lastName": "Nowak",
            "role": "TEACHER"
        }))
        .into_response(),
        Some(STUDENT_TOKEN) => Json(json!({
            "id": 42,
            "email": "jan.kowalski@example.edu",
            "firstName": "Jan",
            "lastName": "Kowalski",
            "role": "STUDENT"
        }))
        .into_response(),
        _ => unauthorized(),
    }
}

async fn fake_class_groups() -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Programowanie 2024", "studentCount": 3, "teacherCount": 1 }
    ]))
}

async fn fake_tasks(Path(course_id): Path<i64>) -> Response {
    if course_id != COURSE_ID {
        return course_not_found();
    }
    Json(json!([
        {
            "id": 10,
            "courseId": 1,
            "title": "Lab 1",
            "sessionName": "Sesja zimowa",
            "gradingMode": "POINTS10",
            "maxPoints": 10,
            "passThreshold": 5
        },
        {
            "id": 11,
            "courseId": 1,
            "title": "Projekt",
            "gradingMode": "PERCENT",
            "passThreshold": 50
        }
    ]))
    .into_response()
}

async fn fake_queue(Query(query): Query<HashMap<String, String>>) -> Response {
    if query.get("courseId").map(String::as_str) != Some("1") {
        return course_not_found();
    }
    Json(json!([
        {
            "artifactId": 100,
            "taskId": 10,
            "courseId": 1,
            "studentId": 42,
            "studentName": "Jan Kowalski",
            "taskTitle": "Lab 1",
            "stageName": "Etap 1",
            "lastRevisionId": 500,
            "lastRevisionStatus": "SUBMITTED",
            "lastSubmittedAt": "2024-01-06T00:00:00Z",
            "softDeadline": "2024-01-05T00:00:00Z",
            "hardDeadline": "2024-01-15T00:00:00Z",
            "lastPointsBrutto": 8
        },
        {
            "artifactId": 101,
            "taskId": 11,
            "courseId": 1,
            "studentId": 43,
            "studentName": "Anna Zielinska",
            "taskTitle": "Projekt",
            "softDeadline": "2024-02-01T00:00:00Z",
            "hardDeadline": "2024-02-10T00:00:00Z"
        },
        {
            "artifactId": 102,
            "taskId": 10,
            "courseId": 1,
            "studentId": 44,
            "studentName": "Piotr Wisniewski",
            "taskTitle": "Lab 1",
            "lastRevisionId": 510,
            "lastRevisionStatus": "NEEDS_FIX",
            "lastSubmittedAt": "2024-01-04T00:00:00Z",
            "lastPointsBrutto": 3
        }
    ]))
    .into_response()
}

async fn fake_history(
    State(backend): State<FakeBackend>,
    Path((artifact_id, student_id)): Path<(i64, i64)>,
) -> Response {
    if backend.fail_history.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let history = match (artifact_id, student_id) {
        (100, 42) => Json(json!([
            {
                "revisionId": 500,
                "createdAt": "2024-01-06T00:00:00Z",
                "status": "SUBMITTED",
                "originalFileName": "lab1-v2.pdf"
            },
            {
                "revisionId": 400,
                "createdAt": "2024-01-04T12:00:00Z",
                "status": "NEEDS_FIX",
                "originalFileName": "lab1.pdf",
                "grades": [{ "gradeId": 1, "pointsBrutto": 4, "statusAfterGrade": "NEEDS_FIX" }]
            }
        ])),
        (102, 44) => Json(json!([
            { "revisionId": 510, "createdAt": "2024-01-04T00:00:00Z", "status": "NEEDS_FIX" }
        ])),
        _ => Json(json!([])),
    };
    history.into_response()
}

async fn fake_own_history(Path(artifact_id): Path<i64>) -> Json<Value> {
    match artifact_id {
        100 => Json(json!([
            { "revisionId": 400, "createdAt": "2024-01-04T12:00:00Z", "status": "NEEDS_FIX" },
            { "revisionId": 500, "createdAt": "2024-01-06T00:00:00Z", "status": "ACCEPTED" }
        ])),
        103 => Json(json!([
            { "revisionId": 600, "createdAt": "2024-01-03T00:00:00Z", "status": "NEEDS_FIX" }
        ])),
        _ => Json(json!([])),
    }
}

async fn fake_student_courses() -> Json<Value> {
    Json(json!([{ "id": 1, "name": "Programowanie 2024" }]))
}

async fn fake_overview(Path(course_id): Path<i64>) -> Response {
    if course_id != COURSE_ID {
        return course_not_found();
    }
    Json(json!([
        {
            "taskId": 10,
            "taskTitle": "Lab 1",
            "sessionName": "Sesja zimowa",
            "artifactId": 100,
            "gradingMode": "POINTS10",
            "maxPoints": 10,
            "passThreshold": 5,
            "lastRevisionStatus": "ACCEPTED",
            "lastSubmittedAt": "2024-01-06T00:00:00Z",
            "lastPointsNetto": 8
        },
        {
            "taskId": 11,
            "taskTitle": "Projekt",
            "artifactId": 101,
            "gradingMode": "PERCENT",
            "passThreshold": 50,
            "softDeadline": "2024-02-01T00:00:00Z",
            "hardDeadline": "2024-02-10T00:00:00Z"
        },
        {
            "taskId": 12,
            "taskTitle": "Raport",
            "sessionName": "Sesja zimowa",
            "artifactId": 103,
            "gradingMode": "POINTS10",
            "maxPoints": 10,
            "passThreshold": 5,
            "softDeadline": "2024-01-01T00:00:00Z",
            "hardDeadline": "2024-01-05T00:00:00Z",
            "lastRevisionStatus": "NEEDS_FIX",
            "lastSubmittedAt": "2024-01-03T00:00:00Z",
            "lastPointsNetto": 4
        }
    ]))
    .into_response()
}

async fn fake_presign(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> Json<Value> {
    let prefix = body["prefix"].as_str().unwrap_or("unknown");
    let name = body["originalFileName"].as_str().unwrap_or("file");
    let file_key = format!("{prefix}/{name}");
    Json(json!({
        "fileKey": file_key,
        "uploadUrl": format!("{}/upload/{file_key}", backend.base_url),
    }))
}

async fn fake_upload(
    State(backend): State<FakeBackend>,
    Path(key): Path<String>,
    body: Bytes,
) -> StatusCode {
    // the object store refuses anything named like a rejected file
    if key.ends_with("odrzucony.pdf") {
        return StatusCode::FORBIDDEN;
    }
    backend.uploads.lock().expect("uploads lock").push((key, body.len()));
    StatusCode::OK
}

async fn fake_submit_revision(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "revisionId": 700, "status": "SUBMITTED", "received": body }))
}

async fn fake_feedback(Path(revision_id): Path<i64>, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "id": 77, "revisionId": revision_id, "received": body }))
}

async fn fake_grade(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "gradeId": 900, "received": body }))
}

async fn fake_csv_export(Path((course_id, kind)): Path<(i64, String)>) -> Response {
    let filename = format!("kurs-{course_id}-{kind}.csv");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        "student;punkty\nJan Kowalski;8\n",
    )
        .into_response()
}

async fn fake_archive(Query(query): Query<HashMap<String, String>>) -> Response {
    let anonymize = query.get("anonymize").cloned().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/zip")], format!("zip:anonymize={anonymize}"))
        .into_response()
}

async fn fake_stats() -> Json<Value> {
    Json(json!([
        { "taskId": 10, "taskTitle": "Lab 1", "passed": 3, "failed": 1, "pending": 2 },
        { "taskId": 11, "taskTitle": "Projekt", "passed": 2, "failed": 2, "pending": 0 }
    ]))
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

/// Multipart POST with one `file` part followed by plain text fields.
pub(crate) fn multipart_request(
    uri: &str,
    token: &str,
    file_name: &str,
    content_type: &str,
    contents: &[u8],
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(b"\r\n");
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n\
                 {value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
        .body(Body::from(body))
        .expect("multipart request")
}

pub(crate) async fn read_json(response: Response<Body>) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) async fn read_text(response: Response<Body>) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    String::from_utf8_lossy(&body).into_owned()
}
