//! Parsing and classification of raw model output. No side effects; the
//! gateway decides whether a failure is worth another model call.

use serde_json::Value;

use super::prompt::CREATE_DOCUMENT_MARKER;
use crate::db::models::{Judgment, SourceRef};

/// Sources are capped; anything past this is dropped silently.
pub const MAX_SOURCES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("model response is not valid JSON")]
    InvalidJson,
    #[error("model response is missing the required `content` field")]
    MissingContent,
}

/// How the reply should be projected into rows: a plain chat answer, or a
/// document draft with bracketing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    Message,
    Document,
}

#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub mode: ReplyMode,
    /// For `Document` replies the marker is already stripped.
    pub body: String,
    pub judgment: Judgment,
    pub sources: Vec<SourceRef>,
}

/// Strict JSON parse, then lenient field acceptance: everything except
/// `content` falls back to a default when missing or malformed.
pub fn parse_reply(raw: &str) -> Result<ParsedReply, ParseError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|_| ParseError::InvalidJson)?;

    let content = value
        .get("content")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ParseError::MissingContent)?;

    let judgment: Judgment = value
        .get("judgment")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let sources: Vec<SourceRef> = value
        .get("sources")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .take(MAX_SOURCES)
                .collect()
        })
        .unwrap_or_default();

    if content.contains(CREATE_DOCUMENT_MARKER) {
        Ok(ParsedReply {
            mode: ReplyMode::Document,
            body: strip_marker(content),
            judgment,
            sources,
        })
    } else {
        Ok(ParsedReply {
            mode: ReplyMode::Message,
            body: content.to_string(),
            judgment,
            sources,
        })
    }
}

fn strip_marker(content: &str) -> String {
    let with_colon = format!("{CREATE_DOCUMENT_MARKER}:");
    let stripped = if content.contains(&with_colon) {
        content.replacen(&with_colon, "", 1)
    } else {
        content.replacen(CREATE_DOCUMENT_MARKER, "", 1)
    };
    stripped.trim().to_string()
}
