// SPDX-License-Identifier: MIT

//! Session binder - maps caller session ids onto workflow threads
//!
//! Every turn runs under a per-thread lock and is committed to the
//! checkpoint store in a single `apply` once the graph reaches END.

pub mod context;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::adk::error::{SessionError, WorkflowError};
use crate::adk::model::{Content, Role};
use crate::sox::prompts;
use crate::sox::workflow::checkpoint::{CheckpointStore, SessionDirectory};
use crate::sox::workflow::graph::WorkflowGraph;
use crate::sox::workflow::state::{Bootstrap, ConversationState, StateDelta};

pub use context::{EmailMessage, EmailSession, Person};

pub struct SessionBinder {
    graph: WorkflowGraph,
    store: Arc<dyn CheckpointStore>,
    directory: Arc<dyn SessionDirectory>,
    self_id: String,
    /// Per-thread turn locks, dropped again once no turn holds or awaits them
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionBinder {
    pub fn new(
        graph: WorkflowGraph,
        store: Arc<dyn CheckpointStore>,
        directory: Arc<dyn SessionDirectory>,
        self_id: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            store,
            directory,
            self_id: self_id.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Binder over a store that also keeps the session directory
    pub fn with_store<S>(graph: WorkflowGraph, store: Arc<S>, self_id: impl Into<String>) -> Self
    where
        S: CheckpointStore + SessionDirectory + 'static,
    {
        Self::new(graph, store.clone(), store, self_id)
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }

    /// Forget the thread's lock unless another turn still holds a handle
    async fn release(&self, thread_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        let idle = locks
            .get(thread_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(thread_id);
        }
    }

    /// Bootstrap a session: one graph pass with no messages, then splice
    /// the hidden first-person instruction onto the checkpoint.
    ///
    /// A thread whose bootstrap committed but whose splice did not is
    /// completed without running the graph again.
    ///
    /// Returns the thread id bound to the session.
    pub async fn initialize(
        &self,
        session_id: &str,
        session: &EmailSession,
    ) -> Result<String, SessionError> {
        let bootstrap = session.resolve(&self.self_id)?;
        let thread_id = self.directory.bind(session_id).await?;

        let lock = self.thread_lock(&thread_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.bootstrap_thread(session_id, &thread_id, bootstrap).await
        };
        self.release(&thread_id, lock).await;

        result.map(|()| thread_id)
    }

    async fn bootstrap_thread(
        &self,
        session_id: &str,
        thread_id: &str,
        bootstrap: Bootstrap,
    ) -> Result<(), SessionError> {
        let state = self.store.load(thread_id).await?.unwrap_or_default();

        let mut committed = match state.bootstrap() {
            None => {
                log::info!("Initializing session {} on thread {}", session_id, thread_id);
                let outcome = self
                    .graph
                    .run(&state, StateDelta::with_bootstrap(bootstrap), None)
                    .await?;
                self.store.apply(thread_id, outcome.delta).await?
            }
            Some(_) if !has_hidden_instruction(&state) => {
                log::warn!(
                    "Session {} was bootstrapped without its hidden instruction, completing it",
                    session_id
                );
                state
            }
            Some(_) => return Err(SessionError::AlreadyInitialized(session_id.to_string())),
        };

        let hidden = committed
            .bootstrap()
            .map(prompts::bootstrap_message)
            .ok_or(WorkflowError::MissingBootstrap)?;
        committed.messages.push(Content::system(hidden));
        self.store.force_set(thread_id, committed).await?;

        Ok(())
    }

    /// Run one turn for an initialized session and return the last message
    pub async fn continue_conversation(
        &self,
        session_id: &str,
        message: &str,
        context: Option<&Value>,
    ) -> Result<String, SessionError> {
        let thread_id = thread_of(self.directory.as_ref(), session_id).await?;

        let lock = self.thread_lock(&thread_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_turn(session_id, &thread_id, message, context).await
        };
        self.release(&thread_id, lock).await;

        result
    }

    async fn run_turn(
        &self,
        session_id: &str,
        thread_id: &str,
        message: &str,
        context: Option<&Value>,
    ) -> Result<String, SessionError> {
        let state = load_initialized(self.store.as_ref(), session_id, thread_id).await?;
        let context = context.map(render_context);

        let outcome = match self
            .graph
            .run(
                &state,
                StateDelta::with_message(Content::user(message)),
                context.as_deref(),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Turn on session {} aborted: {}", session_id, e);
                return Err(e.into());
            }
        };

        let committed = self.store.apply(thread_id, outcome.delta).await?;
        Ok(committed
            .last_message()
            .map(Content::text_content)
            .unwrap_or_default())
    }

    /// Persisted state of an initialized session
    pub async fn history(&self, session_id: &str) -> Result<ConversationState, SessionError> {
        read_history(self.store.as_ref(), self.directory.as_ref(), session_id).await
    }
}

/// Persisted state of an initialized session, read without a model
pub async fn read_history(
    store: &dyn CheckpointStore,
    directory: &dyn SessionDirectory,
    session_id: &str,
) -> Result<ConversationState, SessionError> {
    let thread_id = thread_of(directory, session_id).await?;
    load_initialized(store, session_id, &thread_id).await
}

async fn thread_of(
    directory: &dyn SessionDirectory,
    session_id: &str,
) -> Result<String, SessionError> {
    directory
        .thread_for(session_id)
        .await?
        .ok_or_else(|| SessionError::NotInitialized(session_id.to_string()))
}

async fn load_initialized(
    store: &dyn CheckpointStore,
    session_id: &str,
    thread_id: &str,
) -> Result<ConversationState, SessionError> {
    store
        .load(thread_id)
        .await?
        .filter(|state| state.bootstrap().is_some())
        .ok_or_else(|| SessionError::NotInitialized(session_id.to_string()))
}

fn has_hidden_instruction(state: &ConversationState) -> bool {
    state.messages.iter().any(|m| m.role == Role::System)
}

/// Strings pass through as-is, anything else is pretty-printed JSON
fn render_context(context: &Value) -> String {
    match context {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
