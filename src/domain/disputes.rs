use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind, HasStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    #[default]
    Open,
    UnderReview,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dispute {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "projectId", deserialize_with = "de::id")]
    pub project_id: String,
    #[serde(default, alias = "milestoneId", deserialize_with = "de::opt_id")]
    pub milestone_id: Option<String>,
    #[serde(alias = "raisedBy", deserialize_with = "de::id")]
    pub raised_by: String,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub status: DisputeStatus,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Dispute {
    const KIND: EntityKind = EntityKind::Dispute;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for Dispute {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDisputeInput {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raised_by: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDisputeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DisputeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}
