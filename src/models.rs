//! Core data models shared by the provider client, sync engine, and commands.
//!
//! Remote entities deserialize straight from the service's JSON; unknown
//! fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relative file name → hex-encoded 16-byte content digest.
///
/// Ordered so that sync decisions and output are deterministic.
pub type LocalMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntity")]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntity")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub archived_at: Option<String>,
}

/// Wire shape for organizations and projects. The service sends a string
/// `uuid` and sometimes a numeric `id` alongside it; the uuid wins.
#[derive(Deserialize)]
struct RawEntity {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    archived_at: Option<String>,
}

impl RawEntity {
    fn identifier(&self) -> String {
        match (&self.uuid, &self.id) {
            (Some(uuid), _) => uuid.clone(),
            (None, Some(serde_json::Value::String(id))) => id.clone(),
            (None, Some(other)) => other.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl From<RawEntity> for Organization {
    fn from(raw: RawEntity) -> Self {
        Self {
            id: raw.identifier(),
            name: raw.name,
        }
    }
}

impl From<RawEntity> for Project {
    fn from(raw: RawEntity) -> Self {
        Self {
            id: raw.identifier(),
            name: raw.name,
            archived_at: raw.archived_at,
        }
    }
}

impl Project {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A remote project document. Identity across local/remote is `file_name`;
/// `uuid` is only used to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub uuid: String,
    pub file_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "project_id")]
    pub project_uuid: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, rename = "chat_messages")]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    #[serde(default, rename = "text")]
    pub content: String,
    #[serde(default)]
    pub sender: String,
}

/// A published conversation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(alias = "published_artifact_uuid")]
    pub uuid: String,
    #[serde(default)]
    pub content: String,
}

/// One event on a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEvent {
    /// Incremental completion text.
    CompletionDelta(String),
    /// In-band error text; the stream ends after it.
    Error(String),
    /// Terminal marker for a complete stream.
    Done,
}

impl MessageEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done | MessageEvent::Error(_))
    }
}

/// A stored session key for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub provider: String,
    pub key: String,
    pub expiry: DateTime<Utc>,
}
