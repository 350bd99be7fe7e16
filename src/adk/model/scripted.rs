// SPDX-License-Identifier: MIT

//! Scripted model - replays a queue of predefined replies
//!
//! Every call pops the next reply regardless of which capability was
//! invoked, and records the capability plus the history it received.

use super::{Content, Model, OutputSchema, Role, ToolCall, ToolDeclaration};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// One queued reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Structured(Value),
    /// Repeat the text of the last history entry
    EchoLast,
    /// Fail the call with a provider error
    Fail(String),
}

/// Which port capability a recorded call used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Text,
    Structured,
    Tools,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub capability: Capability,
    pub history: Vec<Content>,
}

pub struct ScriptedModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> ScriptedReply {
        ScriptedReply::Text(text.to_string())
    }

    pub fn route(result: &str) -> ScriptedReply {
        ScriptedReply::Structured(serde_json::json!({ "result": result }))
    }

    pub fn tool_call(id: &str, name: &str, args: Value) -> ScriptedReply {
        ScriptedReply::ToolCalls(vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }])
    }

    /// Queue more replies behind the existing ones
    pub async fn push(&self, replies: impl IntoIterator<Item = ScriptedReply>) {
        self.replies.lock().await.extend(replies);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }

    async fn next(
        &self,
        capability: Capability,
        history: &[Content],
    ) -> Result<ScriptedReply, ModelError> {
        self.calls.lock().await.push(RecordedCall {
            capability,
            history: history.to_vec(),
        });

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .ok_or(ModelError::Exhausted)?;

        match reply {
            ScriptedReply::Fail(message) => Err(ModelError::api("scripted", message)),
            ScriptedReply::EchoLast => Ok(ScriptedReply::Text(
                history.last().map(Content::text_content).unwrap_or_default(),
            )),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn generate_text(&self, history: &[Content]) -> Result<String, ModelError> {
        match self.next(Capability::Text, history).await? {
            ScriptedReply::Text(text) => Ok(text),
            other => Err(ModelError::invalid_response(format!(
                "expected text reply, got {:?}",
                other
            ))),
        }
    }

    async fn generate_structured(
        &self,
        history: &[Content],
        _schema: &OutputSchema,
    ) -> Result<Value, ModelError> {
        match self.next(Capability::Structured, history).await? {
            ScriptedReply::Structured(value) => Ok(value),
            other => Err(ModelError::invalid_response(format!(
                "expected structured reply, got {:?}",
                other
            ))),
        }
    }

    async fn generate_with_tools(
        &self,
        history: &[Content],
        _tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError> {
        match self.next(Capability::Tools, history).await? {
            ScriptedReply::Text(text) => Ok(Content::text(Role::Assistant, text)),
            ScriptedReply::ToolCalls(calls) => Ok(Content::assistant_with_calls("", calls)),
            other => Err(ModelError::invalid_response(format!(
                "expected assistant reply, got {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> OutputSchema {
        OutputSchema {
            name: "route".to_string(),
            description: String::new(),
            schema: json!({}),
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_and_records_calls() {
        let model = ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedModel::text("hello"),
        ]);
        let history = vec![Content::user("hi")];

        let routed = model.generate_structured(&history, &schema()).await.unwrap();
        assert_eq!(routed, json!({"result": "MAIN"}));

        let reply = model.generate_with_tools(&history, &[]).await.unwrap();
        assert_eq!(reply.text_content(), "hello");

        let calls = model.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].capability, Capability::Structured);
        assert_eq!(calls[1].capability, Capability::Tools);
        assert_eq!(calls[1].history, history);
    }

    #[tokio::test]
    async fn test_echo_last_and_exhaustion() {
        let model = ScriptedModel::new(vec![ScriptedReply::EchoLast]);
        let history = vec![Content::user("first"), Content::user("second")];

        assert_eq!(model.generate_text(&history).await.unwrap(), "second");
        assert!(matches!(
            model.generate_text(&history).await,
            Err(ModelError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn test_fail_and_mismatched_reply() {
        let model = ScriptedModel::new(vec![
            ScriptedReply::Fail("throttled".to_string()),
            ScriptedModel::text("not structured"),
        ]);

        let err = model.generate_text(&[]).await.unwrap_err();
        assert_eq!(err.to_string(), "API error from scripted: throttled");

        let err = model.generate_structured(&[], &schema()).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
        assert_eq!(model.remaining().await, 0);
    }
}
