use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub email: String,
    pub display_name: Option<String>,
}

/// `POST /admin/users` — bootstrap a user and hand back a session token.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<Json<Value>, AppError> {
    if body.email.trim().is_empty() {
        return Err(AppError::MalformedRequest("email is required".to_string()));
    }
    let user = state
        .db
        .create_user(body.email.trim(), body.display_name.as_deref())?;
    let token = state.db.create_session(&user.id)?;
    info!(user_id = %user.id, "user created");
    Ok(Json(json!({ "user": user, "token": token })))
}
