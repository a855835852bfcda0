use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind, HasStatus};

/// Milestone lifecycle: pending → in_progress → submitted → approved/rejected → paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    InProgress,
    Submitted,
    Approved,
    Rejected,
    Paid,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }
}

/// Milestone entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, alias = "projectId", deserialize_with = "de::id")]
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::amount")]
    pub amount: i64,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub order: u32,
}

impl Entity for Milestone {
    const KIND: EntityKind = EntityKind::Milestone;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for Milestone {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

/// Request DTO for creating a milestone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMilestoneInput {
    /// Taken from the route when created under a project.
    #[serde(default)]
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// Request DTO for updating a milestone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMilestoneInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MilestoneStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}
