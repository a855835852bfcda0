//! Socket channel for realtime notifications.
//!
//! The hub fans `notification:create` events out to every connected
//! WebSocket; each connection forwards only the events addressed to its user.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::domain::Notification;

pub const NOTIFICATION_CREATE: &str = "notification:create";

/// Wire frame exchanged over the socket: `{ "event": ..., "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl SocketEvent {
    pub fn notification_create(notification: &Notification) -> Self {
        Self {
            event: NOTIFICATION_CREATE.to_string(),
            data: serde_json::to_value(notification).unwrap_or(Value::Null),
        }
    }

    /// Decode the payload of a `notification:create` event.
    pub fn notification(&self) -> Option<Notification> {
        if self.event != NOTIFICATION_CREATE {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Outbound side of the socket as seen by the store.
pub trait NotificationChannel: Send + Sync {
    fn is_connected(&self) -> bool;

    fn emit(&self, notification: &Notification);
}

#[derive(Clone)]
pub struct SocketHub {
    tx: broadcast::Sender<SocketEvent>,
}

impl SocketHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.tx.subscribe()
    }
}

impl NotificationChannel for SocketHub {
    fn is_connected(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    fn emit(&self, notification: &Notification) {
        if !self.is_connected() {
            return;
        }
        let event = SocketEvent::notification_create(notification);
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(error = %e, "No socket subscribers for notification");
        } else {
            tracing::debug!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                "Emitted notification:create"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotificationType;

    fn notification() -> Notification {
        Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            notification_type: NotificationType::BidAccepted,
            title: "Bid accepted".into(),
            description: None,
            link: None,
            read: false,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_emitted_notifications() {
        let hub = SocketHub::new(8);
        assert!(!hub.is_connected());

        let mut rx = hub.subscribe();
        assert!(hub.is_connected());

        hub.emit(&notification());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, NOTIFICATION_CREATE);
        assert_eq!(event.notification(), Some(notification()));
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let hub = SocketHub::new(8);
        hub.emit(&notification());
    }

    #[test]
    fn other_events_carry_no_notification() {
        let event = SocketEvent {
            event: "presence:join".into(),
            data: serde_json::json!({}),
        };
        assert!(event.notification().is_none());
    }
}
