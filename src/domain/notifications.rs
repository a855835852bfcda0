//! Notification domain types
//!
//! In-app notifications, either fetched from the API or synthesized by the
//! store when it observes a status transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind};

/// Notification type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    // Project lifecycle
    ProjectSubmitted,
    ProjectApproved,
    ProjectAssigned,
    ProjectStarted,
    ProjectCompleted,
    ProjectCancelled,

    // Milestones
    MilestoneSubmitted,
    MilestoneApproved,
    MilestoneRejected,

    // Bids
    BidShortlisted,
    BidAccepted,
    BidRejected,
    BidInvitation,
    InvitationAccepted,
    InvitationDeclined,

    // Consultations
    ConsultationScheduled,
    ConsultationCompleted,
    ConsultationCancelled,

    // Money
    PaymentReleased,
    PaymentRefunded,

    // Disputes
    DisputeUnderReview,
    DisputeResolved,
    DisputeClosed,

    NewMessage,

    #[default]
    System,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// Notification entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "userId", deserialize_with = "de::id")]
    pub user_id: String,
    #[serde(default, rename = "type", alias = "notification_type")]
    pub notification_type: NotificationType,
    pub title: String,
    #[serde(default, alias = "message")]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "isRead", alias = "is_read")]
    pub read: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Notification {
    const KIND: EntityKind = EntityKind::Notification;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Unread count response
#[derive(Debug, Clone, Serialize)]
pub struct UnreadCountResponse {
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_displays_as_snake_case() {
        assert_eq!(NotificationType::BidAccepted.to_string(), "bid_accepted");
    }

    #[test]
    fn accepts_legacy_field_names() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "_id": "n1",
            "userId": 12,
            "type": "payment_released",
            "title": "Paid",
            "message": "Funds released",
            "isRead": true
        }))
        .unwrap();

        assert_eq!(n.user_id, "12");
        assert_eq!(n.notification_type, NotificationType::PaymentReleased);
        assert_eq!(n.description.as_deref(), Some("Funds released"));
        assert!(n.read);
    }
}
