use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{EntityKind, UnreadCountResponse};
use crate::error::ApiError;

use super::ensure;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub updated: usize,
}

/// GET /notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Notification).await?;

    let mut notifications = store.notifications_for_user(&auth.user_id);
    if query.unread_only {
        notifications.retain(|n| !n.read);
    }
    Ok(DataResponse::new(notifications))
}

/// GET /notifications/unread-count
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Notification).await?;

    Ok(DataResponse::new(UnreadCountResponse {
        count: store.unread_notification_count(&auth.user_id),
    }))
}

/// PUT /notifications/:notification_id/read
pub async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Notification).await?;

    let owned = store
        .notifications_for_user(&auth.user_id)
        .iter()
        .any(|n| n.id == notification_id);
    if !owned {
        return Err(ApiError::not_found("Notification not found"));
    }

    let notification = store.mark_notification_read(&notification_id).await?;

    tracing::debug!(
        user_id = %auth.user_id,
        notification_id = %notification_id,
        "Marked notification as read"
    );
    Ok(DataResponse::new(notification))
}

/// PUT /notifications/read-all
pub async fn mark_all_as_read(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Notification).await?;

    let updated = store.mark_all_notifications_read().await?;
    tracing::info!(user_id = %auth.user_id, count = updated, "Marked all notifications as read");
    Ok(DataResponse::new(MarkedReadResponse { updated }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::jwt::test_tokens::mint;
    use crate::testing::{test_app, FakeBackend};

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", mint("u1", "freelancer", None, 600)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn app() -> Router {
        app_with(Arc::new(FakeBackend::new()))
    }

    fn app_with(backend: Arc<FakeBackend>) -> Router {
        backend.seed(
            "/notifications",
            vec![
                json!({ "id": "n1", "user_id": "u1", "type": "bid_accepted", "title": "Accepted", "read": false }),
                json!({ "id": "n2", "user_id": "u1", "type": "system", "title": "Welcome", "read": true }),
                json!({ "id": "n3", "user_id": "u1", "type": "system", "title": "Reminder", "read": false }),
                json!({ "id": "n4", "user_id": "someone", "type": "system", "title": "Other", "read": false }),
            ],
        );
        test_app(backend).0
    }

    #[tokio::test]
    async fn lists_only_the_callers_notifications() {
        let app = app();

        let (status, body) = call(&app, Method::GET, "/notifications").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let (_, body) = call(&app, Method::GET, "/notifications?unread_only=true").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn marking_read_updates_the_count() {
        let app = app();

        let (_, body) = call(&app, Method::GET, "/notifications/unread-count").await;
        assert_eq!(body["data"]["count"], 2);

        let (status, body) = call(&app, Method::PUT, "/notifications/n1/read").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["read"], true);

        let (_, body) = call(&app, Method::GET, "/notifications/unread-count").await;
        assert_eq!(body["data"]["count"], 1);

        let (_, body) = call(&app, Method::PUT, "/notifications/read-all").await;
        assert_eq!(body["data"]["updated"], 1);

        let (_, body) = call(&app, Method::GET, "/notifications/unread-count").await;
        assert_eq!(body["data"]["count"], 0);
    }

    #[tokio::test]
    async fn someone_elses_notification_is_left_untouched() {
        let backend = Arc::new(FakeBackend::new());
        let app = app_with(backend.clone());

        let (status, body) = call(&app, Method::PUT, "/notifications/n4/read").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        assert_eq!(backend.calls("PATCH", "/notifications"), 0);
        assert_eq!(backend.record("/notifications", "n4").unwrap()["read"], false);
    }
}
