// SPDX-License-Identifier: MIT

//! Typed error handling for sox-rs
//!
//! Errors are layered: model and state errors bubble up into workflow
//! errors, which in turn bubble up into session errors. Tool failures never
//! appear here as engine errors; the registry turns them into text.

use thiserror::Error;

/// Top-level error type used by the `sox` binary
#[derive(Debug, Error)]
pub enum SoxError {
    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl SoxError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Errors surfaced by the session binder
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session '{0}' has not been initialized")]
    NotInitialized(String),

    #[error("Session '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// Neither party of the email session is the configured self party
    #[error("Neither party of the email session matches self id '{self_id}'")]
    SelfPartyMissing { self_id: String },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that abort a workflow turn
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Triage produced a value outside the routing enumeration
    #[error("Unexpected triage result: {0}")]
    UnexpectedClassification(String),

    /// Main requested tools more often than the per-turn bound allows
    #[error("Tool loop exceeded {limit} cycles in a single turn")]
    ToolLoopExceeded { limit: u32 },

    #[error("Conversation state has no bootstrap context")]
    MissingBootstrap,

    /// A routed node finished without naming its successor
    #[error("Node '{0}' finished without a routing decision")]
    MissingRoute(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Non-success response from a provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Invalid or malformed response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A scripted model ran out of queued replies
    #[error("Scripted model has no replies left")]
    Exhausted,
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

/// Reducer violations on conversation state
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// Subject, transcript and profiles are write-once
    #[error("Bootstrap fields are already set and cannot be overwritten")]
    BootstrapAlreadySet,
}

/// Checkpoint store errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("No checkpoint for thread '{0}'")]
    NotFound(String),

    #[error("Checkpoint connection lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Errors raised inside a tool; converted to text before reaching the model
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}
