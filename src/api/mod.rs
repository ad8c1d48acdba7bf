use serde::{Deserialize, Serialize};

use crate::core::message::{Message, Part, Role};

/// Body of one streamed agent request.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub prompt: String,
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_tools: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    pub fn from_message(message: &Message) -> Option<Self> {
        let content = message.text();
        if content.trim().is_empty() {
            return None;
        }
        Some(Self {
            role: message.role.as_str().to_string(),
            content,
        })
    }
}

/// A message as returned by the session history endpoint.
#[derive(Deserialize, Clone, Debug)]
pub struct StoredMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

impl StoredMessage {
    /// Converts to a transcript message. Roles other than user/assistant are
    /// not part of the transcript and yield `None`.
    pub fn into_message(self) -> Option<Message> {
        let role = Role::try_from(self.role.as_str()).ok()?;
        let parts = match (self.parts, self.content) {
            (Some(parts), _) if !parts.is_empty() => parts,
            (_, Some(content)) => vec![Part::text(content)],
            _ => Vec::new(),
        };
        Some(Message {
            id: self.id,
            role,
            parts,
            is_streaming: false,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct SessionHistoryResponse {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

pub mod sessions;
