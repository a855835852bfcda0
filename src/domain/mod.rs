//! Domain types and DTOs
//!
//! Plain records owned by the marketplace backend. The gateway only holds
//! cached copies keyed by `id`.

pub mod bids;
pub mod consultations;
pub mod de;
pub mod disputes;
pub mod messages;
pub mod milestones;
pub mod notifications;
pub mod payments;
pub mod projects;
pub mod users;

pub use bids::*;
pub use consultations::*;
pub use disputes::*;
pub use messages::*;
pub use milestones::*;
pub use notifications::*;
pub use payments::*;
pub use projects::*;
pub use users::*;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Every entity kind the store tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Milestone,
    Bid,
    BidInvitation,
    Consultation,
    Payment,
    Dispute,
    Message,
    Conversation,
    Notification,
    Freelancer,
    Client,
}

impl EntityKind {
    pub const ALL: [EntityKind; 12] = [
        Self::Project,
        Self::Milestone,
        Self::Bid,
        Self::BidInvitation,
        Self::Consultation,
        Self::Payment,
        Self::Dispute,
        Self::Message,
        Self::Conversation,
        Self::Notification,
        Self::Freelancer,
        Self::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Milestone => "milestone",
            Self::Bid => "bid",
            Self::BidInvitation => "bid_invitation",
            Self::Consultation => "consultation",
            Self::Payment => "payment",
            Self::Dispute => "dispute",
            Self::Message => "message",
            Self::Conversation => "conversation",
            Self::Notification => "notification",
            Self::Freelancer => "freelancer",
            Self::Client => "client",
        }
    }

    /// Collection path on the marketplace API.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Project => "/projects",
            Self::Milestone => "/milestones",
            Self::Bid => "/bids",
            Self::BidInvitation => "/bid-invitations",
            Self::Consultation => "/consultations",
            Self::Payment => "/payments",
            Self::Dispute => "/disputes",
            Self::Message => "/messages",
            Self::Conversation => "/conversations",
            Self::Notification => "/notifications",
            Self::Freelancer => "/freelancers",
            Self::Client => "/clients",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the marketplace API serves and the store caches.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// Entities with a status lifecycle.
pub trait HasStatus {
    fn status_key(&self) -> &'static str;
}
