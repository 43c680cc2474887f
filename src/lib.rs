pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod realtime;
pub mod routes;

use std::sync::Arc;

use chat::pipeline::Pacing;
use db::Database;
use llm::GenerateText;
use realtime::Hub;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub model: Arc<dyn GenerateText>,
    pub hub: Hub,
    pub pacing: Pacing,
}

impl AppState {
    pub fn new(db: Arc<Database>, model: Arc<dyn GenerateText>, pacing: Pacing) -> Self {
        AppState {
            db,
            model,
            hub: Hub::default(),
            pacing,
        }
    }
}
