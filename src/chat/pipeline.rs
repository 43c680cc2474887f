//! Request orchestration: conversation bookkeeping, the generate/parse
//! chain, and the chunked writes that project a reply into rows.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::chunks;
use super::gateway::{self, GatewayError};
use super::parser::{ParsedReply, ReplyMode};
use super::prompt;
use crate::db::models::{
    Conversation, ConversationKind, Document, Judgment, MessageMetadata, Role, SourceRef,
};
use crate::db::Database;
use crate::error::AppError;
use crate::llm::GenerateText;
use crate::realtime::{ChangeEvent, ChangeKind, Hub};

/// User-visible notice written to the conversation when generation fails.
const GENERATION_FAILURE_NOTICE: &str =
    "Could not generate a valid response, please try again.";

/// Chunked-write pacing. One `chunk_size`-character slice is persisted per
/// step, with `delay` between steps.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub chunk_size: usize,
    pub delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            chunk_size: 120,
            delay: Duration::from_millis(50),
        }
    }
}

impl Pacing {
    /// No inter-chunk delay; used by tests and backfill jobs.
    pub fn immediate(chunk_size: usize) -> Self {
        Pacing {
            chunk_size,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub judgment: Judgment,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub conversation_id: String,
    pub message: &'static str,
    pub response_metadata: ResponseMetadata,
}

/// Runs the full chat pipeline for one user query: ensure the conversation
/// exists, record the query, call the model, and stream the reply into a
/// message or a document.
#[allow(clippy::too_many_arguments)]
pub async fn run_chat(
    db: &Database,
    model: &dyn GenerateText,
    hub: &Hub,
    pacing: Pacing,
    user_id: &str,
    conversation_id: Option<String>,
    parent_conversation_id: Option<String>,
    kind: ConversationKind,
    query: &str,
) -> Result<ChatOutcome, AppError> {
    let conversation_id = ensure_conversation(
        db,
        model,
        user_id,
        conversation_id,
        parent_conversation_id,
        kind,
        query,
    )
    .await?;

    let user_message = db.insert_message(
        &Uuid::new_v4().to_string(),
        &conversation_id,
        Some(user_id),
        Role::User,
        query,
        None,
        None,
    )?;
    hub.publish(ChangeEvent::Message {
        kind: ChangeKind::Insert,
        row: user_message,
    });

    let reply = match gateway::generate_reply(model, &prompt::structured_reply_prompt(query)).await
    {
        Ok(reply) => reply,
        Err(err) => {
            record_failure_notice(db, hub, &conversation_id, user_id);
            return Err(match err {
                GatewayError::InvalidResponse => AppError::ModelResponseInvalid,
                GatewayError::Unavailable(cause) => AppError::ModelUnavailable(cause),
            });
        }
    };

    let response_metadata = ResponseMetadata {
        judgment: reply.judgment.clone(),
        sources: reply.sources.clone(),
    };

    match reply.mode {
        ReplyMode::Document => {
            stream_document(db, model, hub, pacing, &conversation_id, user_id, &reply).await?
        }
        ReplyMode::Message => {
            stream_message(db, hub, pacing, &conversation_id, user_id, &reply).await?
        }
    }

    Ok(ChatOutcome {
        conversation_id,
        message: "Request processed successfully",
        response_metadata,
    })
}

/// Creates the conversation row when needed. Passing an id that already has
/// a row is a no-op, and an id without a row is healed with a fresh insert,
/// so repeated calls never produce duplicates. A parent id must name a
/// conversation the caller owns.
pub async fn ensure_conversation(
    db: &Database,
    model: &dyn GenerateText,
    user_id: &str,
    conversation_id: Option<String>,
    parent_conversation_id: Option<String>,
    kind: ConversationKind,
    query: &str,
) -> Result<String, AppError> {
    if let Some(parent_id) = parent_conversation_id.as_deref() {
        db.get_user_conversation(parent_id, user_id)?
            .ok_or(AppError::NotFound("conversation"))?;
    }
    match conversation_id {
        Some(id) => {
            if db.get_conversation(&id)?.is_none() {
                let title = gateway::generate_title(model, query).await;
                db.insert_conversation(&id, user_id, &title, kind, parent_conversation_id.as_deref())?;
                info!(conversation_id = %id, "healed missing conversation row");
            }
            Ok(id)
        }
        None => {
            let id = Uuid::new_v4().to_string();
            let title = gateway::generate_title(model, query).await;
            db.insert_conversation(&id, user_id, &title, kind, parent_conversation_id.as_deref())?;
            Ok(id)
        }
    }
}

/// Creates a subchat branched from a cited source. A subchat of a subchat
/// attaches to the root ancestor, so the hierarchy never exceeds two levels.
pub fn create_subchat(
    db: &Database,
    user_id: &str,
    parent_conversation_id: &str,
    source_text: &str,
) -> Result<Conversation, AppError> {
    let parent = db
        .get_user_conversation(parent_conversation_id, user_id)?
        .ok_or(AppError::NotFound("conversation"))?;

    let root_id = match (parent.kind, parent.parent_conversation_id) {
        (ConversationKind::Subchat, Some(grandparent)) => grandparent,
        _ => parent.id,
    };

    let subchat = db.insert_conversation(
        &Uuid::new_v4().to_string(),
        user_id,
        source_text,
        ConversationKind::Subchat,
        Some(&root_id),
    )?;
    Ok(subchat)
}

/// Revises an existing document through chat: the instruction plus the
/// previous content is sent to the model and the result becomes the next
/// version of the same document chain, written in paced chunks between
/// "updating"/"updated" messages.
pub async fn revise_document(
    db: &Database,
    model: &dyn GenerateText,
    hub: &Hub,
    pacing: Pacing,
    user_id: &str,
    conversation_id: &str,
    document_id: &str,
    instruction: &str,
) -> Result<Document, AppError> {
    let conversation = db
        .get_user_conversation(conversation_id, user_id)?
        .ok_or(AppError::NotFound("conversation"))?;
    let previous = db
        .latest_document(document_id, user_id)?
        .ok_or(AppError::NotFound("document"))?;

    let user_message = db.insert_message(
        &Uuid::new_v4().to_string(),
        &conversation.id,
        Some(user_id),
        Role::User,
        instruction,
        Some(document_id),
        None,
    )?;
    hub.publish(ChangeEvent::Message {
        kind: ChangeKind::Insert,
        row: user_message,
    });

    let drafted = match model
        .generate_text(&prompt::revision_prompt(instruction, &previous.content))
        .await
    {
        Ok(text) => text,
        Err(err) => {
            record_failure_notice(db, hub, &conversation.id, user_id);
            return Err(AppError::ModelUnavailable(err));
        }
    };

    let next_version = previous.version + 1;
    let draft = db.insert_document(
        document_id,
        next_version,
        user_id,
        Some(conversation.id.as_str()),
        &previous.title,
        "",
    )?;
    hub.publish(ChangeEvent::Document {
        kind: ChangeKind::Insert,
        row: draft,
    });

    insert_bracketing_message(
        db,
        hub,
        &conversation.id,
        user_id,
        &format!("updating document {}", previous.title),
        document_id,
        None,
    )?;

    write_document_chunks(db, hub, pacing, document_id, next_version, &drafted).await;

    insert_bracketing_message(
        db,
        hub,
        &conversation.id,
        user_id,
        &format!("updated document {}", previous.title),
        document_id,
        None,
    )?;

    db.latest_document(document_id, user_id)?
        .ok_or(AppError::NotFound("document"))
}

async fn stream_message(
    db: &Database,
    hub: &Hub,
    pacing: Pacing,
    conversation_id: &str,
    user_id: &str,
    reply: &ParsedReply,
) -> Result<(), AppError> {
    let writes: Vec<chunks::ChunkWrite> = chunks::plan(&reply.body, pacing.chunk_size).collect();
    let total = writes.first().map(|w| w.total).unwrap_or(1);

    let message_id = Uuid::new_v4().to_string();
    let placeholder_metadata = MessageMetadata {
        judgment: reply.judgment.clone(),
        sources: reply.sources.clone(),
        is_complete: false,
        current_chunk: Some(0),
        total_chunks: Some(total),
        error: None,
    };
    let placeholder = db.insert_message(
        &message_id,
        conversation_id,
        Some(user_id),
        Role::Assistant,
        "",
        None,
        Some(&placeholder_metadata),
    )?;
    hub.publish(ChangeEvent::Message {
        kind: ChangeKind::Insert,
        row: placeholder,
    });

    for write in writes {
        let metadata = MessageMetadata {
            judgment: reply.judgment.clone(),
            sources: reply.sources.clone(),
            is_complete: write.is_final,
            current_chunk: Some(write.current),
            total_chunks: Some(write.total),
            error: None,
        };
        match db.update_message(&message_id, &write.content, Some(&metadata)) {
            Ok(row) => hub.publish(ChangeEvent::Message {
                kind: ChangeKind::Update,
                row,
            }),
            // Best-effort: a lost intermediate chunk is overwritten by the
            // next one, so the sequence keeps going.
            Err(err) => warn!(chunk = write.current, error = %err, "message chunk write failed"),
        }
        if !write.is_final {
            pause(pacing.delay).await;
        }
    }
    Ok(())
}

async fn stream_document(
    db: &Database,
    model: &dyn GenerateText,
    hub: &Hub,
    pacing: Pacing,
    conversation_id: &str,
    user_id: &str,
    reply: &ParsedReply,
) -> Result<(), AppError> {
    let document_id = Uuid::new_v4().to_string();
    let mut title = gateway::generate_title(model, &reply.body).await;
    if title.is_empty() {
        title = "Untitled Document".to_string();
    }

    let document = db.insert_document(
        &document_id,
        1,
        user_id,
        Some(conversation_id),
        &title,
        "",
    )?;
    hub.publish(ChangeEvent::Document {
        kind: ChangeKind::Insert,
        row: document,
    });

    let bracket_metadata = MessageMetadata {
        judgment: reply.judgment.clone(),
        sources: reply.sources.clone(),
        ..MessageMetadata::default()
    };
    insert_bracketing_message(
        db,
        hub,
        conversation_id,
        user_id,
        &format!("Document {title} creating..."),
        &document_id,
        Some(&bracket_metadata),
    )?;

    write_document_chunks(db, hub, pacing, &document_id, 1, &reply.body).await;

    insert_bracketing_message(
        db,
        hub,
        conversation_id,
        user_id,
        &format!("Document {title} created"),
        &document_id,
        None,
    )?;
    Ok(())
}

async fn write_document_chunks(
    db: &Database,
    hub: &Hub,
    pacing: Pacing,
    document_id: &str,
    version: i64,
    text: &str,
) {
    for write in chunks::plan(text, pacing.chunk_size) {
        match db.update_document_content(document_id, version, &write.content) {
            Ok(row) => hub.publish(ChangeEvent::Document {
                kind: ChangeKind::Update,
                row,
            }),
            Err(err) => warn!(chunk = write.current, error = %err, "document chunk write failed"),
        }
        if !write.is_final {
            pause(pacing.delay).await;
        }
    }
}

fn insert_bracketing_message(
    db: &Database,
    hub: &Hub,
    conversation_id: &str,
    user_id: &str,
    content: &str,
    document_id: &str,
    metadata: Option<&MessageMetadata>,
) -> Result<(), AppError> {
    let row = db.insert_message(
        &Uuid::new_v4().to_string(),
        conversation_id,
        Some(user_id),
        Role::Assistant,
        content,
        Some(document_id),
        metadata,
    )?;
    hub.publish(ChangeEvent::Message {
        kind: ChangeKind::Insert,
        row,
    });
    Ok(())
}

/// Best-effort assistant-visible notice; the user is never left without
/// feedback for a failed generation.
fn record_failure_notice(db: &Database, hub: &Hub, conversation_id: &str, user_id: &str) {
    let metadata = MessageMetadata::for_error("generation_failed");
    match db.insert_message(
        &Uuid::new_v4().to_string(),
        conversation_id,
        Some(user_id),
        Role::Assistant,
        GENERATION_FAILURE_NOTICE,
        None,
        Some(&metadata),
    ) {
        Ok(row) => hub.publish(ChangeEvent::Message {
            kind: ChangeKind::Insert,
            row,
        }),
        Err(err) => warn!(error = %err, "failed to record generation failure notice"),
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
