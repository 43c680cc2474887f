use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::chat::pipeline::{self, ChatOutcome};
use crate::db::models::{Conversation, ConversationKind, Message};
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct GenerateParams {
    pub conversation_id: Option<String>,
    pub parent_conversation_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
pub struct GenerateBody {
    pub query: String,
}

#[derive(Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// `POST /chat` — runs the full generation pipeline for one user query.
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<GenerateParams>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<ChatOutcome>, AppError> {
    if body.query.trim().is_empty() {
        return Err(AppError::MalformedRequest("query is required".to_string()));
    }
    let kind = match params.kind.as_deref() {
        None => ConversationKind::Chat,
        Some(raw) => ConversationKind::parse(raw).ok_or_else(|| {
            AppError::MalformedRequest(format!("unknown conversation type: {raw}"))
        })?,
    };

    info!(user_id = %user.user_id, "chat generation requested");
    let outcome = pipeline::run_chat(
        &state.db,
        state.model.as_ref(),
        &state.hub,
        state.pacing,
        &user.user_id,
        params.conversation_id,
        params.parent_conversation_id,
        kind,
        &body.query,
    )
    .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct FetchParams {
    pub conversation_id: Option<String>,
}

/// `GET /chat` — all of the caller's conversations with their messages, or
/// one conversation when `conversation_id` is given.
pub async fn fetch(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<FetchParams>,
) -> Result<Json<Value>, AppError> {
    match params.conversation_id {
        None => {
            let mut conversations = Vec::new();
            for conversation in state.db.list_conversations(&user.user_id)? {
                let messages = state.db.list_messages(&conversation.id)?;
                conversations.push(ConversationWithMessages {
                    conversation,
                    messages,
                });
            }
            Ok(Json(json!({ "conversations": conversations })))
        }
        Some(id) => {
            let conversation = state
                .db
                .get_user_conversation(&id, &user.user_id)?
                .ok_or(AppError::NotFound("conversation"))?;
            let messages = state.db.list_messages(&conversation.id)?;
            Ok(Json(json!({
                "conversation": ConversationWithMessages { conversation, messages }
            })))
        }
    }
}

#[derive(Deserialize)]
pub struct RemoveParams {
    pub id: Option<String>,
}

/// `DELETE /chat?id=` — delete a conversation owned by the caller.
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RemoveParams>,
) -> Result<Json<Value>, AppError> {
    let id = params
        .id
        .ok_or_else(|| AppError::MalformedRequest("id is required".to_string()))?;
    let deleted = state.db.delete_conversation(&id, &user.user_id)?;
    if deleted == 0 {
        return Err(AppError::NotFound("conversation"));
    }
    Ok(Json(json!({ "message": "Conversation deleted" })))
}
