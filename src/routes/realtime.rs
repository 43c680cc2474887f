use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct StreamParams {
    pub conversation_id: Option<String>,
}

/// `GET /realtime?conversation_id=` — server-sent events carrying message
/// and document change notifications for one conversation. Lagged
/// subscribers silently skip dropped events; per-row last-write-wins means
/// the next update restores their view.
pub async fn stream(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let conversation_id = params
        .conversation_id
        .ok_or_else(|| AppError::MalformedRequest("conversation_id is required".to_string()))?;
    state
        .db
        .get_user_conversation(&conversation_id, &user.user_id)?
        .ok_or(AppError::NotFound("conversation"))?;

    let events = BroadcastStream::new(state.hub.subscribe()).filter_map(move |received| {
        let event = received.ok()?;
        if event.conversation_id() != Some(conversation_id.as_str()) {
            return None;
        }
        let data = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().data(data)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
