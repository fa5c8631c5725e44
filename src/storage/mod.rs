//! SQLite mirror of conversation turns and uploaded file contents.
//!
//! Everything here is auxiliary: callers log failures and move on. The
//! `files` table additionally backs the naive keyword lookup used to pull
//! previously uploaded code into chat prompts.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, params_from_iter, Connection};

use crate::session::Role;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS turns (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL,
    role        TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS files (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id   TEXT NOT NULL,
    file_name    TEXT NOT NULL,
    file_content TEXT NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id);
CREATE INDEX IF NOT EXISTS idx_files_session ON files(session_id);
";

/// A stored upload row returned by keyword search.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub file_content: String,
}

pub struct TranscriptStore {
    conn: Mutex<Connection>,
}

impl TranscriptStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn record_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().expect("transcript store lock poisoned");
        conn.execute(
            "INSERT INTO turns (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role.as_str(), content, now()],
        )?;
        Ok(())
    }

    pub fn record_file(
        &self,
        session_id: &str,
        file_name: &str,
        file_content: &str,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().expect("transcript store lock poisoned");
        conn.execute(
            "INSERT INTO files (session_id, file_name, file_content, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, file_name, file_content, now()],
        )?;
        Ok(())
    }

    /// Returns this session's stored files whose content contains any
    /// whitespace-split token of `message` (naive substring retrieval).
    pub fn search_files(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<Vec<StoredFile>, rusqlite::Error> {
        let tokens: Vec<&str> = message.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let like_clauses = vec!["file_content LIKE ?"; tokens.len()].join(" OR ");
        let sql = format!(
            "SELECT file_name, file_content FROM files WHERE session_id = ? AND ({like_clauses})"
        );

        let mut bindings: Vec<String> = Vec::with_capacity(tokens.len() + 1);
        bindings.push(session_id.to_string());
        bindings.extend(tokens.iter().map(|token| format!("%{token}%")));

        let conn = self.conn.lock().expect("transcript store lock poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bindings.iter()), |row| {
            Ok(StoredFile {
                file_name: row.get(0)?,
                file_content: row.get(1)?,
            })
        })?;
        rows.collect()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
