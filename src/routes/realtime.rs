//! WebSocket endpoint for realtime notifications.
//!
//! Browsers cannot set headers on a socket handshake, so the token may also be
//! passed as `?token=`.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::app::AppState;
use crate::auth::middleware::{authenticate, AuthError};
use crate::services::{SocketEvent, SocketHub};
use crate::store::DataStore;

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// GET /ws
pub async fn socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SocketQuery>,
) -> Result<Response, AuthError> {
    let token = bearer_token(&headers)
        .or(query.token)
        .ok_or(AuthError::MissingToken)?;
    let auth = authenticate(&state, &token)?;
    let store = state.store_for(&auth).await;

    tracing::info!(user_id = %auth.user_id, "Socket connected");

    // A socket marks an active client; warm its cache in the background
    tokio::spawn({
        let store = store.clone();
        async move {
            if let Err(e) = store.load_all().await {
                tracing::warn!(user_id = %store.user_id(), error = %e, "Initial session load failed");
            }
        }
    });

    Ok(ws.on_upgrade(move |socket| serve_socket(socket, state.hub.clone(), store)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn serve_socket(socket: WebSocket, hub: SocketHub, store: DataStore) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(text) = outbound(&store, &event).await else {
                        continue;
                    };
                    if sender.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %store.user_id(), skipped, "Socket lagged behind");
                }
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => inbound(&store, &text).await,
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Socket read failed");
                    break;
                }
            },
        }
    }

    tracing::info!(user_id = %store.user_id(), "Socket disconnected");
}

/// Frame to forward for a hub event, if it is addressed to this session's
/// user. The notification is cached on the way through.
async fn outbound(store: &DataStore, event: &SocketEvent) -> Option<String> {
    let notification = event.notification()?;
    if notification.user_id != store.user_id() {
        return None;
    }
    store.receive_notification(notification).await;
    serde_json::to_string(event).ok()
}

/// Handle a frame sent by the client. Notifications for this user are cached.
/// Clients never address other users; those notifications are raised by the
/// stores themselves when statuses change.
async fn inbound(store: &DataStore, text: &str) {
    let event: SocketEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed socket frame");
            return;
        }
    };
    let Some(notification) = event.notification() else {
        tracing::debug!(event = %event.event, "Ignoring unknown socket event");
        return;
    };

    if notification.user_id != store.user_id() {
        tracing::warn!(
            user_id = %store.user_id(),
            recipient = %notification.user_id,
            "Dropping socket notification addressed to another user"
        );
        return;
    }
    store.receive_notification(notification).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Notification, NotificationType};
    use crate::store::{LoadPolicy, MemoryStorage};
    use crate::testing::FakeBackend;

    fn notification(id: &str, user_id: &str) -> Notification {
        Notification {
            id: id.into(),
            user_id: user_id.into(),
            notification_type: NotificationType::NewMessage,
            title: "New message".into(),
            description: None,
            link: None,
            read: false,
            created_at: None,
        }
    }

    async fn store(user_id: &str) -> DataStore {
        DataStore::open(
            user_id,
            Arc::new(FakeBackend::new()),
            Arc::new(MemoryStorage::new()),
            None,
            LoadPolicy::default(),
        )
        .await
    }

    #[test]
    fn reads_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn forwards_only_own_notifications() {
        let store = store("u1").await;

        let own = SocketEvent::notification_create(&notification("n1", "u1"));
        let text = outbound(&store, &own).await.unwrap();
        assert!(text.contains("notification:create"));
        assert_eq!(store.unread_notification_count("u1"), 1);

        // Duplicates are still forwarded but cached once
        assert!(outbound(&store, &own).await.is_some());
        assert_eq!(store.notifications_for_user("u1").len(), 1);

        let other = SocketEvent::notification_create(&notification("n2", "u2"));
        assert!(outbound(&store, &other).await.is_none());
    }

    #[tokio::test]
    async fn inbound_frames_for_others_are_dropped() {
        let hub = SocketHub::new(8);
        let mut rx = hub.subscribe();
        let store = store("u1").await;

        let own = serde_json::to_string(&SocketEvent::notification_create(&notification(
            "n1", "u1",
        )))
        .unwrap();
        inbound(&store, &own).await;
        assert_eq!(store.unread_notification_count("u1"), 1);

        let forged = serde_json::to_string(&SocketEvent::notification_create(&notification(
            "n2", "u2",
        )))
        .unwrap();
        inbound(&store, &forged).await;
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
        assert!(store.notifications_for_user("u2").is_empty());

        inbound(&store, "not json").await;
        inbound(&store, r#"{"event":"typing","data":{}}"#).await;
        assert_eq!(store.snapshot().notifications.len(), 1);
    }
}
