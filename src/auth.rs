//! Bearer-token session extraction. A request carries
//! `Authorization: Bearer <token>`; the token maps to a user through the
//! sessions table or the request is rejected with 401 before any state is
//! touched.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::AppState;

pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
        let user_id = state
            .db
            .session_user(token)?
            .ok_or(AppError::Unauthorized)?;
        Ok(AuthUser { user_id })
    }
}
