use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::ids")]
    pub participants: Vec<String>,
    #[serde(default, alias = "projectId", deserialize_with = "de::opt_id")]
    pub project_id: Option<String>,
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Conversation {
    const KIND: EntityKind = EntityKind::Conversation;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "conversationId", deserialize_with = "de::id")]
    pub conversation_id: String,
    #[serde(alias = "senderId", deserialize_with = "de::id")]
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Message {
    const KIND: EntityKind = EntityKind::Message;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationInput {
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageInput {
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub content: String,
}
