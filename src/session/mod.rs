//! Per-session bounded conversation history.
//!
//! The in-memory log is authoritative for the live conversation; the
//! transcript mirror is best-effort auxiliary storage and its failures
//! never roll back an append.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::storage::TranscriptStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message exchange unit. Immutable once created; insertion order is
/// the only relation between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Session-keyed turn logs with FIFO eviction.
pub struct SessionStore {
    inner: RwLock<HashMap<String, Vec<Turn>>>,
    max_turns: usize,
    mirror: Option<Arc<TranscriptStore>>,
}

impl SessionStore {
    pub fn new(max_turns: usize, mirror: Option<Arc<TranscriptStore>>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            max_turns: max_turns.max(1),
            mirror,
        }
    }

    /// Current history for a session, oldest first. Unknown sessions have
    /// an empty history.
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        let guard = self.inner.read().await;
        guard.get(session_id).cloned().unwrap_or_default()
    }

    /// Appends the user turn, then the model turn (each when present), then
    /// trims the oldest turns until the log fits the configured bound.
    pub async fn append(
        &self,
        session_id: &str,
        user_content: Option<&str>,
        model_content: Option<&str>,
    ) {
        let mut appended = Vec::new();
        if let Some(content) = user_content {
            appended.push(Turn::new(Role::User, content));
        }
        if let Some(content) = model_content {
            appended.push(Turn::new(Role::Model, content));
        }
        if appended.is_empty() {
            return;
        }

        {
            let mut guard = self.inner.write().await;
            let history = guard.entry(session_id.to_string()).or_default();
            history.extend(appended.iter().cloned());
            let excess = history.len().saturating_sub(self.max_turns);
            if excess > 0 {
                history.drain(..excess);
                tracing::debug!(
                    session_id,
                    evicted = excess,
                    "trimmed session history to {} turns",
                    self.max_turns
                );
            }
        }

        if let Some(ref mirror) = self.mirror {
            for turn in &appended {
                if let Err(err) = mirror.record_turn(session_id, turn.role, &turn.content) {
                    tracing::warn!(session_id, "failed to mirror turn to transcript store: {err}");
                }
            }
        }
    }
}

/// Clips an upload-description history entry to the configured length,
/// appending a fixed marker when anything was dropped.
pub fn clip_history_entry(entry: &str, max_len: usize) -> String {
    if entry.len() <= max_len {
        return entry.to_string();
    }
    let mut cut = max_len;
    while !entry.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...(entry truncated)", &entry[..cut])
}
