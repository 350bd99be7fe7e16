// SPDX-License-Identifier: MIT

//! Node bodies: Triage, Main, Tool and Summarizer

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::executor::WorkflowGraph;
use super::types::{Next, NodeId, NodeOutput};
use crate::adk::error::{ModelError, WorkflowError};
use crate::adk::model::{Content, OutputSchema};
use crate::sox::prompts;
use crate::sox::workflow::state::{Bootstrap, ConversationState, StateDelta};

static ROUTER_SCHEMA: Lazy<OutputSchema> = Lazy::new(|| OutputSchema {
    name: "route".to_string(),
    description: "Result from triage model".to_string(),
    schema: json!({
        "type": "object",
        "properties": {
            "result": {
                "type": "string",
                "enum": ["SUMMARIZE", "MAIN"],
                "description": "Result from triage model"
            }
        },
        "required": ["result"]
    }),
});

/// Triage decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Summarize,
    Main,
}

impl Route {
    /// Interpret a structured reply. A missing or non-string `result` is a
    /// malformed provider reply; an unknown label is a classification error.
    pub fn parse(value: &Value) -> Result<Self, WorkflowError> {
        let result = value.get("result").and_then(Value::as_str).ok_or_else(|| {
            ModelError::invalid_response(format!("triage reply without result: {}", value))
        })?;

        match result {
            "SUMMARIZE" => Ok(Route::Summarize),
            "MAIN" => Ok(Route::Main),
            other => Err(WorkflowError::UnexpectedClassification(other.to_string())),
        }
    }

    fn target(self) -> NodeId {
        match self {
            Route::Summarize => NodeId::Summarizer,
            Route::Main => NodeId::Main,
        }
    }
}

/// Node prompt as the leading user entry, followed by the conversation
fn with_prompt(prompt: String, state: &ConversationState) -> Vec<Content> {
    let mut history = Vec::with_capacity(state.messages.len() + 1);
    history.push(Content::user(prompt));
    history.extend(state.messages.iter().cloned());
    history
}

fn require_bootstrap(state: &ConversationState) -> Result<&Bootstrap, WorkflowError> {
    state.bootstrap().ok_or(WorkflowError::MissingBootstrap)
}

impl WorkflowGraph {
    pub(super) async fn triage(
        &self,
        state: &ConversationState,
    ) -> Result<NodeOutput, WorkflowError> {
        let prompt = prompts::triage_prompt(require_bootstrap(state)?);
        let value = self
            .model
            .generate_structured(&with_prompt(prompt, state), &ROUTER_SCHEMA)
            .await?;

        let route = Route::parse(&value)?;
        log::info!("Triage routed to {:?}", route);
        Ok(NodeOutput::routed(Next::Node(route.target())))
    }

    pub(super) async fn main(&self, state: &ConversationState) -> Result<NodeOutput, WorkflowError> {
        let prompt = prompts::main_prompt(require_bootstrap(state)?);
        let message = self
            .model
            .generate_with_tools(&with_prompt(prompt, state), &self.tools.declarations())
            .await?;

        let calls = message.tool_calls();
        log::info!("Main produced a reply with {} tool call(s)", calls.len());

        Ok(NodeOutput::update(StateDelta {
            messages: vec![message],
            pending_tool_calls: Some(calls),
            ..StateDelta::default()
        }))
    }

    pub(super) async fn tool(&self, state: &ConversationState) -> Result<NodeOutput, WorkflowError> {
        let mut results = Vec::with_capacity(state.pending_tool_calls.len());

        for call in &state.pending_tool_calls {
            log::info!("Calling tool: {} with args: {}", call.name, call.args);
            let result = self
                .tools
                .invoke(&call.name, call.args.clone(), state)
                .await;
            results.push(Content::tool_result(call, result));
        }

        log::info!("Back to main node");
        Ok(NodeOutput::update(StateDelta {
            messages: results,
            pending_tool_calls: Some(Vec::new()),
            ..StateDelta::default()
        }))
    }

    pub(super) async fn summarizer(
        &self,
        state: &ConversationState,
        context: Option<&str>,
    ) -> Result<NodeOutput, WorkflowError> {
        let prompt = prompts::summarizer_prompt(context);
        let summary = self
            .model
            .generate_text(&with_prompt(prompt, state))
            .await?;

        Ok(NodeOutput::update(StateDelta::with_message(
            Content::assistant(summary),
        )))
    }
}
