use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind, HasStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    #[default]
    Requested,
    Scheduled,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Pre-project call between a client and an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consultation {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "clientId", deserialize_with = "de::id")]
    pub client_id: String,
    #[serde(default, alias = "projectId", deserialize_with = "de::opt_id")]
    pub project_id: Option<String>,
    #[serde(default, alias = "agentId", deserialize_with = "de::opt_id")]
    pub agent_id: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "scheduledAt")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ConsultationStatus,
}

impl Consultation {
    pub fn involves(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.agent_id.as_deref() == Some(user_id)
    }
}

impl Entity for Consultation {
    const KIND: EntityKind = EntityKind::Consultation;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for Consultation {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultationInput {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConsultationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConsultationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}
