use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListParams {
    pub conversation_id: Option<String>,
}

/// `GET /messages?conversation_id=` — messages of an owned conversation in
/// chronological order.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, AppError> {
    let conversation_id = params
        .conversation_id
        .ok_or_else(|| AppError::MalformedRequest("conversation_id is required".to_string()))?;
    let conversation = state
        .db
        .get_user_conversation(&conversation_id, &user.user_id)?
        .ok_or(AppError::NotFound("conversation"))?;
    let messages = state.db.list_messages(&conversation.id)?;
    Ok(Json(json!({
        "messages": messages,
        "conversationId": conversation.id,
    })))
}
