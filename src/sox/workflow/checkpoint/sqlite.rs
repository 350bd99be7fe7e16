// SPDX-License-Identifier: MIT

//! SQLite-backed checkpoint store
//!
//! States are stored as JSON, one row per thread. Session bindings live in
//! a second table so they survive restarts alongside the checkpoints.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{new_thread_id, CheckpointStore, SessionDirectory};
use crate::adk::error::CheckpointError;
use crate::sox::workflow::state::{ConversationState, StateDelta};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_threads (
    session_id TEXT PRIMARY KEY,
    thread_id TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
"#;

/// Thread-safe checkpoint database handle
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CheckpointError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CheckpointError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CheckpointError> {
        self.conn.lock().map_err(|_| CheckpointError::Poisoned)
    }

    fn read_state(
        conn: &Connection,
        thread_id: &str,
    ) -> Result<Option<ConversationState>, CheckpointError> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT state FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn load_sync(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        let conn = self.lock()?;
        Self::read_state(&conn, thread_id)
    }

    fn apply_sync(
        &self,
        thread_id: &str,
        delta: StateDelta,
    ) -> Result<ConversationState, CheckpointError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut state = Self::read_state(&tx, thread_id)?.unwrap_or_default();
        state.apply(delta)?;

        tx.execute(
            "INSERT INTO checkpoints (thread_id, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(thread_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![thread_id, serde_json::to_string(&state)?, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(state)
    }

    fn force_set_sync(
        &self,
        thread_id: &str,
        state: &ConversationState,
    ) -> Result<(), CheckpointError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE checkpoints SET state = ?2, updated_at = ?3 WHERE thread_id = ?1",
            params![thread_id, serde_json::to_string(state)?, Utc::now().to_rfc3339()],
        )?;

        if updated == 0 {
            return Err(CheckpointError::NotFound(thread_id.to_string()));
        }
        Ok(())
    }

    fn thread_for_sync(&self, session_id: &str) -> Result<Option<String>, CheckpointError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT thread_id FROM session_threads WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn bind_sync(&self, session_id: &str) -> Result<String, CheckpointError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO session_threads (session_id, thread_id, created_at) VALUES (?1, ?2, ?3)",
            params![session_id, new_thread_id(), Utc::now().to_rfc3339()],
        )?;
        Ok(conn.query_row(
            "SELECT thread_id FROM session_threads WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?)
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        self.load_sync(thread_id)
    }

    async fn apply(
        &self,
        thread_id: &str,
        delta: StateDelta,
    ) -> Result<ConversationState, CheckpointError> {
        self.apply_sync(thread_id, delta)
    }

    async fn force_set(
        &self,
        thread_id: &str,
        state: ConversationState,
    ) -> Result<(), CheckpointError> {
        self.force_set_sync(thread_id, &state)
    }
}

#[async_trait]
impl SessionDirectory for SqliteCheckpointStore {
    async fn thread_for(&self, session_id: &str) -> Result<Option<String>, CheckpointError> {
        self.thread_for_sync(session_id)
    }

    async fn bind(&self, session_id: &str) -> Result<String, CheckpointError> {
        self.bind_sync(session_id)
    }
}
