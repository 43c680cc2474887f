//! In-process change notification. Row mutations on the message and
//! document tables are published here after the store write succeeds;
//! subscribers (the SSE route, the reconciliation client) filter by
//! conversation. Delivery is last-write-wins with no sequence numbers.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::models::{Document, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "table")]
pub enum ChangeEvent {
    #[serde(rename = "messages")]
    Message { kind: ChangeKind, row: Message },
    #[serde(rename = "documents")]
    Document { kind: ChangeKind, row: Document },
}

impl ChangeEvent {
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            ChangeEvent::Message { row, .. } => Some(&row.conversation_id),
            ChangeEvent::Document { row, .. } => row.conversation_id.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Hub { tx }
    }

    /// Best-effort fan-out; publishing with no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Hub::new(256)
    }
}
