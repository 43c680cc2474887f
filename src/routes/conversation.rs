use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::chat::pipeline;
use crate::db::models::Conversation;
use crate::error::AppError;
use crate::AppState;

#[derive(Serialize)]
pub struct ConversationNode {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(rename = "subConversations")]
    pub sub_conversations: Vec<Conversation>,
}

/// `GET /conversation` — root conversations with their subchats nested one
/// level deep. Subchats whose parent is gone are dropped from the tree.
pub async fn tree(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationNode>>, AppError> {
    let all = state.db.list_conversations(&user.user_id)?;
    let (roots, subchats): (Vec<_>, Vec<_>) = all
        .into_iter()
        .partition(|c| c.parent_conversation_id.is_none());

    let mut nodes: Vec<ConversationNode> = roots
        .into_iter()
        .map(|conversation| ConversationNode {
            conversation,
            sub_conversations: Vec::new(),
        })
        .collect();

    for subchat in subchats {
        let parent_id = subchat.parent_conversation_id.clone().unwrap_or_default();
        if let Some(node) = nodes.iter_mut().find(|n| n.conversation.id == parent_id) {
            node.sub_conversations.push(subchat);
        }
    }
    Ok(Json(nodes))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubchatBody {
    pub source_text: String,
    pub parent_conversation_id: String,
}

/// `POST /conversation/subconversation` — branch a subchat off a cited
/// source. The parent is resolved to the root ancestor.
pub async fn create_subchat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateSubchatBody>,
) -> Result<Json<Conversation>, AppError> {
    if body.source_text.trim().is_empty() {
        return Err(AppError::MalformedRequest("sourceText is required".to_string()));
    }
    let subchat = pipeline::create_subchat(
        &state.db,
        &user.user_id,
        &body.parent_conversation_id,
        &body.source_text,
    )?;
    Ok(Json(subchat))
}

/// `GET /conversation/subconversation` — the caller's subchats, newest first.
pub async fn list_subchats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(state.db.list_subchats(&user.user_id)?))
}
