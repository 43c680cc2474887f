pub mod models;

use models::{Conversation, ConversationKind, Document, Message, MessageMetadata, Role, User};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::sync::Mutex;

/// SQLite-backed store. Every call locks the connection for its own
/// duration; there are no cross-call transactions, so each statement is
/// the unit of atomicity.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &std::path::Path) -> Result<Self> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        let conn = Connection::open(db_path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT 'chat' CHECK (type IN ('chat', 'subchat')),
                parent_conversation_id TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (parent_conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                user_id TEXT,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                document_id TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                user_id TEXT NOT NULL,
                conversation_id TEXT,
                title TEXT NOT NULL DEFAULT 'Untitled Document',
                content TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'draft',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (id, version)
            );
            ",
        )?;
        Ok(())
    }

    // ── Users & sessions ──

    pub fn create_user(&self, email: &str, display_name: Option<&str>) -> Result<User> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, email, display_name) VALUES (?1, ?2, ?3)",
            params![id, email, display_name],
        )?;
        conn.query_row(
            "SELECT id, email, display_name, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
    }

    pub fn create_session(&self, user_id: &str) -> Result<String> {
        let conn = self.conn.lock().unwrap();
        let token = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions (token, user_id) VALUES (?1, ?2)",
            params![token, user_id],
        )?;
        Ok(token)
    }

    pub fn session_user(&self, token: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_id FROM sessions WHERE token = ?1",
            params![token],
            |row| row.get(0),
        )
        .optional()
    }

    // ── Conversations ──

    pub fn insert_conversation(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        kind: ConversationKind,
        parent_conversation_id: Option<&str>,
    ) -> Result<Conversation> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations (id, user_id, title, type, parent_conversation_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, user_id, title, kind, parent_conversation_id],
        )?;
        conn.query_row(
            "SELECT id, user_id, title, type, parent_conversation_id, created_at
             FROM conversations WHERE id = ?1",
            params![id],
            conversation_from_row,
        )
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, title, type, parent_conversation_id, created_at
             FROM conversations WHERE id = ?1",
            params![id],
            conversation_from_row,
        )
        .optional()
    }

    pub fn get_user_conversation(&self, id: &str, user_id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, title, type, parent_conversation_id, created_at
             FROM conversations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            conversation_from_row,
        )
        .optional()
    }

    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, type, parent_conversation_id, created_at
             FROM conversations WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id], conversation_from_row)?;
        rows.collect()
    }

    pub fn list_subchats(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, type, parent_conversation_id, created_at
             FROM conversations WHERE user_id = ?1 AND type = 'subchat'
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id], conversation_from_row)?;
        rows.collect()
    }

    /// Returns the number of deleted rows; 0 when the conversation does not
    /// exist or belongs to another user.
    pub fn delete_conversation(&self, id: &str, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM conversations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
    }

    // ── Messages ──

    #[allow(clippy::too_many_arguments)]
    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        user_id: Option<&str>,
        role: Role,
        content: &str,
        document_id: Option<&str>,
        metadata: Option<&MessageMetadata>,
    ) -> Result<Message> {
        let conn = self.conn.lock().unwrap();
        let metadata_json = metadata.map(|m| serde_json::to_string(m).unwrap_or_default());
        conn.execute(
            "INSERT INTO messages (id, conversation_id, user_id, role, content, document_id, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, conversation_id, user_id, role, content, document_id, metadata_json],
        )?;
        conn.query_row(
            "SELECT id, conversation_id, user_id, role, content, document_id, metadata, created_at
             FROM messages WHERE id = ?1",
            params![id],
            message_from_row,
        )
    }

    pub fn update_message(
        &self,
        id: &str,
        content: &str,
        metadata: Option<&MessageMetadata>,
    ) -> Result<Message> {
        let conn = self.conn.lock().unwrap();
        let metadata_json = metadata.map(|m| serde_json::to_string(m).unwrap_or_default());
        conn.execute(
            "UPDATE messages SET content = ?1, metadata = COALESCE(?2, metadata) WHERE id = ?3",
            params![content, metadata_json, id],
        )?;
        conn.query_row(
            "SELECT id, conversation_id, user_id, role, content, document_id, metadata, created_at
             FROM messages WHERE id = ?1",
            params![id],
            message_from_row,
        )
    }

    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, user_id, role, content, document_id, metadata, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], message_from_row)?;
        rows.collect()
    }

    // ── Documents ──

    #[allow(clippy::too_many_arguments)]
    pub fn insert_document(
        &self,
        id: &str,
        version: i64,
        user_id: &str,
        conversation_id: Option<&str>,
        title: &str,
        content: &str,
    ) -> Result<Document> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO documents (id, version, user_id, conversation_id, title, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, version, user_id, conversation_id, title, content],
        )?;
        conn.query_row(
            "SELECT id, version, user_id, conversation_id, title, content, status, created_at
             FROM documents WHERE id = ?1 AND version = ?2",
            params![id, version],
            document_from_row,
        )
    }

    pub fn latest_version(&self, id: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT MAX(version) FROM documents WHERE id = ?1",
            params![id],
            |row| row.get::<_, Option<i64>>(0),
        )
    }

    pub fn latest_document(&self, id: &str, user_id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, version, user_id, conversation_id, title, content, status, created_at
             FROM documents WHERE id = ?1 AND user_id = ?2
             ORDER BY version DESC LIMIT 1",
            params![id, user_id],
            document_from_row,
        )
        .optional()
    }

    pub fn list_document_versions(&self, id: &str, user_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, version, user_id, conversation_id, title, content, status, created_at
             FROM documents WHERE id = ?1 AND user_id = ?2 ORDER BY version ASC",
        )?;
        let rows = stmt.query_map(params![id, user_id], document_from_row)?;
        rows.collect()
    }

    pub fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, version, user_id, conversation_id, title, content, status, created_at
             FROM documents WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id], document_from_row)?;
        rows.collect()
    }

    pub fn list_conversation_documents(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, version, user_id, conversation_id, title, content, status, created_at
             FROM documents WHERE conversation_id = ?1 AND user_id = ?2
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![conversation_id, user_id], document_from_row)?;
        rows.collect()
    }

    pub fn update_document_content(&self, id: &str, version: i64, content: &str) -> Result<Document> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE documents SET content = ?1 WHERE id = ?2 AND version = ?3",
            params![content, id, version],
        )?;
        conn.query_row(
            "SELECT id, version, user_id, conversation_id, title, content, status, created_at
             FROM documents WHERE id = ?1 AND version = ?2",
            params![id, version],
            document_from_row,
        )
    }

    pub fn update_document(
        &self,
        id: &str,
        version: i64,
        title: Option<&str>,
        content: Option<&str>,
        status: Option<&str>,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE documents SET
                 title = COALESCE(?1, title),
                 content = COALESCE(?2, content),
                 status = COALESCE(?3, status)
             WHERE id = ?4 AND version = ?5",
            params![title, content, status, id, version],
        )
    }

    /// Removes every version of the document.
    pub fn delete_document(&self, id: &str, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM documents WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
    }
}

fn conversation_from_row(row: &rusqlite::Row<'_>) -> Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        kind: row.get(3)?,
        parent_conversation_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> Result<Message> {
    let metadata: Option<String> = row.get(6)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        document_id: row.get(5)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: row.get(7)?,
    })
}

fn document_from_row(row: &rusqlite::Row<'_>) -> Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        version: row.get(1)?,
        user_id: row.get(2)?,
        conversation_id: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}
