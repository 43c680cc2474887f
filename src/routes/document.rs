use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::chat::pipeline;
use crate::error::AppError;
use crate::realtime::{ChangeEvent, ChangeKind};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub conversation_id: Option<String>,
    pub document_id: Option<String>,
}

/// `POST /document` — create a document, or the next version of an existing
/// chain when `documentId` names one.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>, AppError> {
    if let Some(id) = &body.document_id {
        if Uuid::parse_str(id).is_err() {
            return Err(AppError::MalformedRequest(
                "invalid documentId format".to_string(),
            ));
        }
    }
    let document_id = body
        .document_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let version = state.db.latest_version(&document_id)?.unwrap_or(0) + 1;

    let document = state.db.insert_document(
        &document_id,
        version,
        &user.user_id,
        body.conversation_id.as_deref(),
        body.title.as_deref().unwrap_or("Untitled Document"),
        body.content.as_deref().unwrap_or(""),
    )?;
    state.hub.publish(ChangeEvent::Document {
        kind: ChangeKind::Insert,
        row: document,
    });

    Ok(Json(json!({
        "documentId": document_id,
        "version": version,
        "message": "Document created successfully",
    })))
}

#[derive(Deserialize)]
pub struct FetchParams {
    pub id: Option<String>,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
}

/// `GET /document` — by id (all versions), by conversation, or everything
/// the caller owns.
pub async fn fetch(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<FetchParams>,
) -> Result<Json<Value>, AppError> {
    if let Some(id) = params.id {
        let versions = state.db.list_document_versions(&id, &user.user_id)?;
        if versions.is_empty() {
            return Err(AppError::NotFound("document"));
        }
        return Ok(Json(json!(versions)));
    }
    if let Some(conversation_id) = params.conversation_id {
        let documents = state
            .db
            .list_conversation_documents(&conversation_id, &user.user_id)?;
        return Ok(Json(json!({ "documents": documents })));
    }
    let documents = state.db.list_documents(&user.user_id)?;
    Ok(Json(json!({ "documents": documents })))
}

#[derive(Deserialize)]
pub struct UpdateBody {
    pub id: Option<String>,
    pub version: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
}

/// `PATCH /document` — edit the latest version in place. Naming any other
/// version is rejected; historical versions are immutable.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Value>, AppError> {
    let id = body
        .id
        .ok_or_else(|| AppError::MalformedRequest("id is required".to_string()))?;
    let latest = state
        .db
        .latest_document(&id, &user.user_id)?
        .ok_or(AppError::NotFound("document"))?;
    if let Some(version) = body.version {
        if version != latest.version {
            return Err(AppError::StaleDocumentVersion);
        }
    }

    state.db.update_document(
        &id,
        latest.version,
        body.title.as_deref(),
        body.content.as_deref(),
        body.status.as_deref(),
    )?;
    if let Some(row) = state.db.latest_document(&id, &user.user_id)? {
        state.hub.publish(ChangeEvent::Document {
            kind: ChangeKind::Update,
            row,
        });
    }

    Ok(Json(json!({ "message": "Document updated successfully" })))
}

#[derive(Deserialize)]
pub struct RemoveParams {
    pub id: Option<String>,
}

/// `DELETE /document?id=` — remove a document chain the caller owns.
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RemoveParams>,
) -> Result<Json<Value>, AppError> {
    let id = params
        .id
        .ok_or_else(|| AppError::MalformedRequest("id is required".to_string()))?;
    let deleted = state.db.delete_document(&id, &user.user_id)?;
    if deleted == 0 {
        return Err(AppError::NotFound("document"));
    }
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

#[derive(Deserialize)]
pub struct ReviseParams {
    pub conversation_id: Option<String>,
    pub document_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviseBody {
    pub text: String,
}

/// `PATCH /document/revise` — chat-driven revision: the instruction plus
/// the current draft go to the model and the result becomes the next
/// version of the chain, streamed in chunks.
pub async fn revise(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ReviseParams>,
    Json(body): Json<ReviseBody>,
) -> Result<Json<Value>, AppError> {
    let conversation_id = params
        .conversation_id
        .ok_or_else(|| AppError::MalformedRequest("conversation_id is required".to_string()))?;
    let document_id = params
        .document_id
        .ok_or_else(|| AppError::MalformedRequest("document_id is required".to_string()))?;
    if body.text.trim().is_empty() {
        return Err(AppError::MalformedRequest("text is required".to_string()));
    }

    let document = pipeline::revise_document(
        &state.db,
        state.model.as_ref(),
        &state.hub,
        state.pacing,
        &user.user_id,
        &conversation_id,
        &document_id,
        &body.text,
    )
    .await?;
    Ok(Json(json!({ "success": true, "document": document })))
}
