use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::notification::{
    MarkReadResponse, NotificationItem, NotificationsQuery, NotificationsResponse,
};
use crate::schemas::types::UserRole;
use crate::services::notifications::{for_student, for_teacher, unread_ids, Notification};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read", post(mark_notifications_read))
}

async fn current_notifications(
    state: &AppState,
    user: &CurrentUser,
    course_id: Option<i64>,
) -> Result<Vec<Notification>, ApiError> {
    let course_id =
        course_id.ok_or_else(|| ApiError::BadRequest("course_id is required".to_string()))?;
    let backend = state.backend();

    match user.profile.role {
        UserRole::Teacher | UserRole::Admin => {
            let queue = backend.teacher_queue(&user.token, course_id).await?;
            let mut seen = HashSet::new();
            let pairs: Vec<(i64, i64)> = queue
                .iter()
                .map(|entry| (entry.artifact_id, entry.student_id))
                .filter(|pair| seen.insert(*pair))
                .collect();
            let counts = backend.revision_counts(&user.token, &pairs).await;
            Ok(for_teacher(&queue, &counts))
        }
        UserRole::Student => {
            let overview = backend.student_overview(&user.token, course_id).await?;
            Ok(for_student(&overview, user.profile.id))
        }
    }
}

async fn list_notifications(
    Query(query): Query<NotificationsQuery>,
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let notifications = current_notifications(&state, &user, query.course_id).await?;
    let read = state.read_markers().read_ids(user.profile.id).await;
    let unread_count = unread_ids(&notifications, &read).len();

    let items = notifications
        .into_iter()
        .map(|notification| NotificationItem {
            read: read.contains(&notification.id),
            notification,
        })
        .collect();

    Ok(Json(NotificationsResponse { items, unread_count }))
}

async fn mark_notifications_read(
    Query(query): Query<NotificationsQuery>,
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let notifications = current_notifications(&state, &user, query.course_id).await?;
    let markers = state.read_markers();
    let unread = unread_ids(&notifications, &markers.read_ids(user.profile.id).await);

    markers.mark_read(user.profile.id, &unread).await;
    tracing::debug!(user_id = user.profile.id, marked = unread.len(), "Notifications marked read");

    Ok(Json(MarkReadResponse { marked: unread.len() }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support::{
        json_request, read_json, setup_test_context, STUDENT_TOKEN, TEACHER_TOKEN,
    };

    #[tokio::test]
    async fn course_id_is_required() {
        let ctx = setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, "/api/v1/notifications", Some(TEACHER_TOKEN), None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn teacher_sees_new_submissions_until_marked_read() {
        let ctx = setup_test_context().await;
        let list = || {
            json_request(Method::GET, "/api/v1/notifications?course_id=1", Some(TEACHER_TOKEN), None)
        };

        let json = read_json(ctx.app.clone().oneshot(list()).await.expect("response")).await;
        let items = json["items"].as_array().expect("items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["kind"], "SUBMISSION");
        assert_eq!(items[0]["id"], "submission:100:42:500");
        assert_eq!(items[0]["message"], "Nowe oddanie od Jan Kowalski do zadania Lab 1 (Etap 2)");
        assert_eq!(items[0]["read"], false);
        assert_eq!(json["unread_count"], 1);

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/notifications/read?course_id=1",
                Some(TEACHER_TOKEN),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["marked"], 1);

        let json = read_json(ctx.app.clone().oneshot(list()).await.expect("response")).await;
        assert_eq!(json["items"][0]["read"], true);
        assert_eq!(json["unread_count"], 0);
        assert!(ctx.state.read_markers().read_ids(7).await.contains("submission:100:42:500"));
    }

    #[tokio::test]
    async fn student_sees_new_returned_and_accepted_work() {
        let ctx = setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::GET,
                "/api/v1/notifications?course_id=1",
                Some(STUDENT_TOKEN),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        let kinds: Vec<&str> = json["items"]
            .as_array()
            .expect("items")
            .iter()
            .filter_map(|item| item["kind"].as_str())
            .collect();
        assert_eq!(kinds, vec!["ACCEPTED", "NEW_TASK", "FEEDBACK"]);
        assert_eq!(json["items"][1]["message"], "Nowe zadanie: Projekt");
        assert_eq!(json["unread_count"], 3);
    }
}
