use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// A conversation thread. Root chats have no parent; subchats always point
/// at a root chat (the hierarchy is flattened to two levels on creation).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    pub parent_conversation_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Chat,
    Subchat,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Chat => "chat",
            ConversationKind::Subchat => "subchat",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(ConversationKind::Chat),
            "subchat" => Some(ConversationKind::Subchat),
            _ => None,
        }
    }
}

impl ToSql for ConversationKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ConversationKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        ConversationKind::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown conversation type: {text}").into()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(FromSqlError::Other(format!("unknown role: {other}").into())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub user_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub document_id: Option<String>,
    pub metadata: Option<MessageMetadata>,
    pub created_at: String,
}

/// Assessment and citation payload attached to assistant messages, plus
/// chunked-write progress. Stored as a JSON text column; field names match
/// the client wire shape.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MessageMetadata {
    #[serde(default)]
    pub judgment: Judgment,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default, rename = "isComplete")]
    pub is_complete: bool,
    #[serde(rename = "currentChunk", skip_serializing_if = "Option::is_none")]
    pub current_chunk: Option<u32>,
    #[serde(rename = "totalChunks", skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageMetadata {
    pub fn for_error(note: &str) -> Self {
        MessageMetadata {
            error: Some(note.to_string()),
            ..MessageMetadata::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Judgment {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SourceRef {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// One version of a drafted document. Versions of the same document share
/// an id; `(id, version)` identifies a row and only the highest version is
/// editable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Document {
    pub id: String,
    pub version: i64,
    pub user_id: String,
    pub conversation_id: Option<String>,
    pub title: String,
    pub content: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: String,
}
