// SPDX-License-Identifier: MIT

//! Checkpoint storage for conversation threads
//!
//! A store keeps the latest `ConversationState` per thread id. Turns are
//! committed with `apply`, which runs the state reducer; `force_set`
//! overwrites without reducing and is only used to splice the hidden
//! bootstrap message. Both are atomic per call.

pub mod sqlite;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::adk::error::CheckpointError;
use crate::sox::workflow::state::{ConversationState, StateDelta};

pub use sqlite::SqliteCheckpointStore;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Latest committed state, `None` if the thread was never written
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError>;

    /// Reduce `delta` into the stored state, creating the thread if needed
    async fn apply(
        &self,
        thread_id: &str,
        delta: StateDelta,
    ) -> Result<ConversationState, CheckpointError>;

    /// Replace the stored state of an existing thread
    async fn force_set(
        &self,
        thread_id: &str,
        state: ConversationState,
    ) -> Result<(), CheckpointError>;
}

/// Maps external session ids to thread ids
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn thread_for(&self, session_id: &str) -> Result<Option<String>, CheckpointError>;

    /// Return the thread bound to `session_id`, binding a fresh one if none
    async fn bind(&self, session_id: &str) -> Result<String, CheckpointError>;
}

pub fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Process-local store, lost on exit
#[derive(Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, ConversationState>>,
    sessions: RwLock<HashMap<String, String>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn apply(
        &self,
        thread_id: &str,
        delta: StateDelta,
    ) -> Result<ConversationState, CheckpointError> {
        let mut threads = self.threads.write().await;
        let mut state = threads.get(thread_id).cloned().unwrap_or_default();
        state.apply(delta)?;
        threads.insert(thread_id.to_string(), state.clone());
        Ok(state)
    }

    async fn force_set(
        &self,
        thread_id: &str,
        state: ConversationState,
    ) -> Result<(), CheckpointError> {
        let mut threads = self.threads.write().await;
        match threads.get_mut(thread_id) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(CheckpointError::NotFound(thread_id.to_string())),
        }
    }
}

#[async_trait]
impl SessionDirectory for MemoryCheckpointStore {
    async fn thread_for(&self, session_id: &str) -> Result<Option<String>, CheckpointError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn bind(&self, session_id: &str) -> Result<String, CheckpointError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .entry(session_id.to_string())
            .or_insert_with(new_thread_id)
            .clone())
    }
}
