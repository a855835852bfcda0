use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind};

/// Marketplace roles carried in the session token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Client,
    Freelancer,
    Admin,
    Agent,
}

impl UserRole {
    pub fn from_claim(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "freelancer" => Self::Freelancer,
            "admin" => Self::Admin,
            "agent" => Self::Agent,
            _ => Self::Client,
        }
    }

    /// Admins and agents triage projects on behalf of the platform.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Agent)
    }
}

/// Vetted freelancer profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Freelancer {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, alias = "hourlyRate", deserialize_with = "de::opt_amount")]
    pub hourly_rate: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vetted: bool,
}

impl Entity for Freelancer {
    const KIND: EntityKind = EntityKind::Freelancer;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl Entity for Client {
    const KIND: EntityKind = EntityKind::Client;

    fn id(&self) -> &str {
        &self.id
    }
}
