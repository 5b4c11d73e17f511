//! SQLite persistence for conversation sessions
//!
//! One row per session id; the full conversation state is stored as JSON so
//! a conversation survives process restarts. Cross-conversation isolation
//! holds end to end: nothing in here is shared between session rows.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use uuid::Uuid;

use crate::conversation::state::ConversationState;

/// Database wrapper for session persistence
pub struct SessionStore {
    conn: Connection,
}

/// Listing entry for one stored session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub request: String,
    pub phase: String,
    pub role_titles: Vec<String>,
    pub updated_at: DateTime<Local>,
    pub completed: bool,
}

impl SessionStore {
    /// Open (or create) the store at the specified path
    pub fn new(path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self { conn })
    }

    /// Create an in-memory store (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Initialize schema with tables and indexes
    pub fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                -- Primary key: session identity, partitions all state
                id TEXT PRIMARY KEY,

                -- Denormalized columns for listing without JSON parsing
                request TEXT NOT NULL,
                phase TEXT NOT NULL,
                role_titles TEXT NOT NULL,

                -- Full conversation state
                state TEXT NOT NULL,

                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
            ON sessions(updated_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// Insert or update a session from its conversation state
    pub fn save(&self, state: &ConversationState) -> Result<()> {
        let titles: Vec<&str> = state.roles.iter().map(|r| r.title.as_str()).collect();
        let titles_json = serde_json::to_string(&titles)?;
        let state_json = serde_json::to_string(state)?;
        let now = Local::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO sessions (id, request, phase, role_titles, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(id) DO UPDATE SET
                request = excluded.request,
                phase = excluded.phase,
                role_titles = excluded.role_titles,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
            params![
                state.session_id.to_string(),
                state.original_request,
                state.phase.as_str(),
                titles_json,
                state_json,
                now,
            ],
        )?;

        Ok(())
    }

    /// Load a session's conversation state by id
    pub fn load(&self, id: &Uuid) -> Result<Option<ConversationState>> {
        let state_json: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM sessions WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match state_json {
            Some(json) => {
                let state = serde_json::from_str(&json)
                    .map_err(|e| anyhow!("Failed to parse stored session state: {}", e))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Delete a session; returns whether a row was removed
    pub fn delete(&self, id: &Uuid) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// List sessions, most recently updated first
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, request, phase, role_titles, updated_at
            FROM sessions
            ORDER BY updated_at DESC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let request: String = row.get(1)?;
                let phase: String = row.get(2)?;
                let titles_json: String = row.get(3)?;
                let updated_at: String = row.get(4)?;
                Ok((id, request, phase, titles_json, updated_at))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (id, request, phase, titles_json, updated_at) in rows {
            let id = Uuid::parse_str(&id)
                .with_context(|| format!("Invalid session id in store: {}", id))?;
            let role_titles: Vec<String> = serde_json::from_str(&titles_json).unwrap_or_default();
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .with_context(|| format!("Invalid timestamp in store for {}", id))?
                .with_timezone(&Local);
            let completed = phase == "complete";
            summaries.push(SessionSummary {
                id,
                request,
                phase,
                role_titles,
                updated_at,
                completed,
            });
        }

        Ok(summaries)
    }

    /// Delete sessions not updated for the given number of days
    pub fn cleanup_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = (Local::now() - Duration::days(days)).to_rfc3339();
        let deleted = self.conn.execute(
            "DELETE FROM sessions WHERE updated_at < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::state::{JobRole, Phase};

    fn sample_state(request: &str) -> ConversationState {
        let mut state = ConversationState::new(request);
        state.roles.push(JobRole::new("Founding Engineer"));
        state.phase = Phase::AwaitingUser;
        state
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let store = SessionStore::new_in_memory().unwrap();
        store.initialize_schema().unwrap();

        let state = sample_state("I need a founding engineer");
        store.save(&state).unwrap();

        let loaded = store.load(&state.session_id).unwrap().unwrap();
        assert_eq!(loaded.session_id, state.session_id);
        assert_eq!(loaded.original_request, "I need a founding engineer");
        assert_eq!(loaded.roles.len(), 1);
        assert_eq!(loaded.phase, Phase::AwaitingUser);
    }

    #[test]
    fn test_load_missing_session_returns_none() {
        let store = SessionStore::new_in_memory().unwrap();
        store.initialize_schema().unwrap();

        assert!(store.load(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_save_is_an_upsert() {
        let store = SessionStore::new_in_memory().unwrap();
        store.initialize_schema().unwrap();

        let mut state = sample_state("hire someone");
        store.save(&state).unwrap();

        state.phase = Phase::Complete;
        state.roles.push(JobRole::new("Designer"));
        store.save(&state).unwrap();

        let loaded = store.load(&state.session_id).unwrap().unwrap();
        assert_eq!(loaded.phase, Phase::Complete);
        assert_eq!(loaded.roles.len(), 2);

        // Still a single row
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_includes_titles_and_completion() {
        let store = SessionStore::new_in_memory().unwrap();
        store.initialize_schema().unwrap();

        let mut first = sample_state("first request");
        first.phase = Phase::Complete;
        store.save(&first).unwrap();

        let second = sample_state("second request");
        store.save(&second).unwrap();

        let sessions = store.list().unwrap();
        assert_eq!(sessions.len(), 2);

        let completed = sessions.iter().find(|s| s.id == first.session_id).unwrap();
        assert!(completed.completed);
        assert_eq!(completed.role_titles, vec!["Founding Engineer"]);

        let open = sessions.iter().find(|s| s.id == second.session_id).unwrap();
        assert!(!open.completed);
    }

    #[test]
    fn test_delete_session() {
        let store = SessionStore::new_in_memory().unwrap();
        store.initialize_schema().unwrap();

        let state = sample_state("hire someone");
        store.save(&state).unwrap();

        assert!(store.delete(&state.session_id).unwrap());
        assert!(!store.delete(&state.session_id).unwrap());
        assert!(store.load(&state.session_id).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_old_sessions() {
        let store = SessionStore::new_in_memory().unwrap();
        store.initialize_schema().unwrap();

        let old = sample_state("old request");
        store.save(&old).unwrap();
        // Backdate the row
        let backdated = (Local::now() - Duration::days(30)).to_rfc3339();
        store
            .conn
            .execute(
                "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
                params![backdated, old.session_id.to_string()],
            )
            .unwrap();

        let recent = sample_state("recent request");
        store.save(&recent).unwrap();

        let deleted = store.cleanup_older_than(7).unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, recent.session_id);
    }
}
