mod admin;
mod chat;
mod conversation;
mod document;
mod messages;
mod realtime;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/chat",
            post(chat::generate)
                .get(chat::fetch)
                .delete(chat::remove),
        )
        .route("/conversation", get(conversation::tree))
        .route(
            "/conversation/subconversation",
            post(conversation::create_subchat).get(conversation::list_subchats),
        )
        .route("/messages", get(messages::list))
        .route(
            "/document",
            post(document::create)
                .get(document::fetch)
                .patch(document::update)
                .delete(document::remove),
        )
        .route("/document/revise", patch(document::revise))
        .route("/realtime", get(realtime::stream))
        .route("/admin/users", post(admin::create_user))
        .with_state(state)
}
