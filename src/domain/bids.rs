use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind, HasStatus};

/// Bid status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[default]
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shortlisted => "shortlisted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// Still competing for the project.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Rejected | Self::Withdrawn)
    }
}

/// Bid entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bid {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "projectId", deserialize_with = "de::id")]
    pub project_id: String,
    #[serde(alias = "freelancerId", deserialize_with = "de::id")]
    pub freelancer_id: String,
    #[serde(deserialize_with = "de::amount")]
    pub amount: i64,
    #[serde(default, alias = "timelineDays")]
    pub timeline_days: Option<u32>,
    #[serde(default, alias = "coverLetter")]
    pub proposal: Option<String>,
    #[serde(default)]
    pub status: BidStatus,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Bid {
    const KIND: EntityKind = EntityKind::Bid;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for Bid {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

/// Request DTO for creating a bid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBidInput {
    #[serde(default)]
    pub project_id: String,
    /// Filled from the session when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freelancer_id: Option<String>,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<String>,
}

/// Request DTO for updating a bid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBidInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BidStatus>,
}

impl UpdateBidInput {
    pub fn status(status: BidStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Invitation status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }
}

/// Admin/agent-initiated solicitation for a specific freelancer to bid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BidInvitation {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "projectId", deserialize_with = "de::id")]
    pub project_id: String,
    #[serde(alias = "freelancerId", deserialize_with = "de::id")]
    pub freelancer_id: String,
    #[serde(alias = "invitedBy", deserialize_with = "de::id")]
    pub invited_by: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: InvitationStatus,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for BidInvitation {
    const KIND: EntityKind = EntityKind::BidInvitation;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for BidInvitation {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

/// Request DTO for inviting a freelancer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBidInvitationInput {
    #[serde(default)]
    pub project_id: String,
    pub freelancer_id: String,
    /// Filled from the session when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request DTO for responding to an invitation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBidInvitationInput {
    pub status: InvitationStatus,
}
