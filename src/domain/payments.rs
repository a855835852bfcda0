use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind, HasStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    #[default]
    Milestone,
    Refund,
    Payout,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    /// Funds logically held in escrow against the project.
    Held,
    Released,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Held => "held",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }
}

/// Escrow ledger entry. No real money moves through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "projectId", deserialize_with = "de::id")]
    pub project_id: String,
    #[serde(default, alias = "milestoneId", deserialize_with = "de::opt_id")]
    pub milestone_id: Option<String>,
    #[serde(default, alias = "payeeId", deserialize_with = "de::opt_id")]
    pub payee_id: Option<String>,
    #[serde(deserialize_with = "de::amount")]
    pub amount: i64,
    #[serde(default, rename = "type", alias = "payment_type")]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Payment {
    const KIND: EntityKind = EntityKind::Payment;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for Payment {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentInput {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_id: Option<String>,
    pub amount: i64,
    #[serde(default, rename = "type")]
    pub payment_type: PaymentType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePaymentInput {
    pub status: PaymentStatus,
}
