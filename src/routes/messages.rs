use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateConversationInput, EntityKind, SendMessageInput};
use crate::error::ApiError;

use super::ensure;

/// GET /conversations
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Conversation).await?;
    Ok(DataResponse::new(store.conversations_for_user(&auth.user_id)))
}

/// POST /conversations
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<CreateConversationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    let conversation = store.create_conversation(input).await?;
    Ok(Created(conversation))
}

/// GET /conversations/:conversation_id/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Conversation).await?;
    ensure(&store, EntityKind::Message).await?;

    let conversation = store
        .conversation(&conversation_id)
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    if !conversation.participants.contains(&auth.user_id) {
        return Err(ApiError::forbidden("Not a participant in this conversation"));
    }
    Ok(DataResponse::new(
        store.messages_by_conversation(&conversation_id),
    ))
}

/// POST /conversations/:conversation_id/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(conversation_id): Path<String>,
    Json(mut input): Json<SendMessageInput>,
) -> Result<impl IntoResponse, ApiError> {
    input.conversation_id = conversation_id;

    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Conversation).await?;
    let message = store.send_message(input).await?;
    Ok(Created(message))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::jwt::test_tokens::mint;
    use crate::testing::{test_app, FakeBackend};

    fn request(method: Method, uri: &str, user: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", mint(user, "client", None, 600)),
            )
            .header(header::CONTENT_TYPE, "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn seeded() -> Arc<FakeBackend> {
        let backend = Arc::new(FakeBackend::new());
        backend.seed(
            "/conversations",
            vec![json!({ "id": "cv1", "participants": ["c1", "f1"] })],
        );
        backend.seed(
            "/messages",
            vec![json!({ "id": "msg1", "conversation_id": "cv1", "sender_id": "f1", "content": "Hi" })],
        );
        backend
    }

    #[tokio::test]
    async fn participants_read_and_post_messages() {
        let (app, _) = test_app(seeded());

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/conversations/cv1/messages",
                "c1",
                Some(json!({ "content": "Hello" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/conversations/cv1/messages", "c1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let response = app
            .oneshot(request(Method::GET, "/conversations", "c1", None))
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"][0]["last_message"], "Hello");
    }

    #[tokio::test]
    async fn outsiders_cannot_read_a_conversation() {
        let (app, _) = test_app(seeded());

        let response = app
            .oneshot(request(Method::GET, "/conversations/cv1/messages", "x9", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
