//! Client-side merge of change events into in-memory conversation state.
//!
//! Merge rules, in order: a row with a known id is overwritten in place; an
//! inserted row with an unknown id first tries to claim an optimistic local
//! echo (same content and role) before being appended. Document updates are
//! upserted by id, and a "creating…" placeholder message pointing at the
//! document picks up the document's title. Updates are applied as they
//! arrive; there is no sequence check, so delivery order is trusted.

use super::hub::{ChangeEvent, ChangeKind};
use crate::db::models::{Document, Message};

pub struct ChatView {
    conversation_id: String,
    pub messages: Vec<Message>,
    pub documents: Vec<Document>,
}

impl ChatView {
    pub fn new(conversation_id: impl Into<String>, initial_messages: Vec<Message>) -> Self {
        ChatView {
            conversation_id: conversation_id.into(),
            messages: initial_messages,
            documents: Vec::new(),
        }
    }

    /// Applies one change event. Events for other conversations are ignored.
    pub fn apply(&mut self, event: &ChangeEvent) {
        if event.conversation_id() != Some(self.conversation_id.as_str()) {
            return;
        }
        match event {
            ChangeEvent::Message { kind, row } => self.apply_message(*kind, row),
            ChangeEvent::Document { kind, row } => {
                if *kind == ChangeKind::Update {
                    self.apply_document(row);
                }
            }
        }
    }

    fn apply_message(&mut self, kind: ChangeKind, row: &Message) {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == row.id) {
            *existing = row.clone();
            return;
        }
        if kind == ChangeKind::Insert {
            // An optimistic local echo has a placeholder id; claim it by
            // content and role instead of duplicating the message.
            if let Some(echo) = self
                .messages
                .iter_mut()
                .find(|m| m.content == row.content && m.role == row.role)
            {
                *echo = row.clone();
            } else {
                self.messages.push(row.clone());
            }
        }
    }

    fn apply_document(&mut self, row: &Document) {
        if let Some(existing) = self.documents.iter_mut().find(|d| d.id == row.id) {
            *existing = row.clone();
        } else {
            self.documents.push(row.clone());
        }

        if let Some(placeholder) = self.messages.iter_mut().find(|m| {
            m.document_id.as_deref() == Some(row.id.as_str()) && m.content.contains("creating")
        }) {
            placeholder.content = format!("Document {} creating...", row.title);
        }
    }
}
