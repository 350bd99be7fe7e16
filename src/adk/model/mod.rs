// SPDX-License-Identifier: MIT

//! Model module - defines the language model port and shared message types
//!
//! The engine talks to a provider through three capabilities:
//! plain text generation, structured output, and tool-aware generation.
//! Implementations live in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [mock] - canned offline replies, selectable as a provider
//! - [scripted] - replays queued replies, for tests

pub mod anthropic;
pub mod mock;
pub mod scripted;

use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// HTTP limits for remote providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    /// Whole request, from send to the last body byte
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(120),
            request: Duration::from_secs(120),
        }
    }
}

/// Who authored a conversation entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Regular text
    Text(String),
    /// Tool call requested by the model
    FunctionCall {
        id: String,
        name: String,
        args: Value,
    },
    /// Result of executing a tool call, correlated by call id
    FunctionResponse {
        id: String,
        name: String,
        response: String,
    },
}

/// A tool invocation request attached to an assistant entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// Tool declaration handed to the model when binding tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's arguments
    pub parameters: Value,
}

/// Declared shape of a structured-output reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl Content {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Assistant entry carrying tool calls, with optional leading text
    pub fn assistant_with_calls(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let text = text.into();
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }
        parts.extend(calls.into_iter().map(|c| Part::FunctionCall {
            id: c.id,
            name: c.name,
            args: c.args,
        }));
        Self {
            role: Role::Assistant,
            parts,
        }
    }

    /// Tool-role entry answering a single call
    pub fn tool_result(call: &ToolCall, response: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: response.into(),
            }],
        }
    }

    /// Textual content of the entry. Tool entries yield their result text.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            let piece = match part {
                Part::Text(t) => t.as_str(),
                Part::FunctionResponse { response, .. } => response.as_str(),
                Part::FunctionCall { .. } => continue,
            };
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(piece);
        }
        out
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall { id, name, args } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    args: args.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// The language model port
///
/// Implementations own their retry policy; the engine never retries.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate free-form text from a message history
    async fn generate_text(&self, history: &[Content]) -> Result<String, ModelError>;

    /// Generate a value conforming to `schema`
    async fn generate_structured(
        &self,
        history: &[Content],
        schema: &OutputSchema,
    ) -> Result<Value, ModelError>;

    /// Generate an assistant entry while aware of the declared tools.
    /// The returned entry may carry tool calls.
    async fn generate_with_tools(
        &self,
        history: &[Content],
        tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_with_calls_skips_empty_text() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "write_reply_to_file".to_string(),
            args: json!({"content": "hi"}),
        };
        let content = Content::assistant_with_calls("", vec![call.clone()]);

        assert_eq!(content.role, Role::Assistant);
        assert_eq!(content.parts.len(), 1);
        assert_eq!(content.tool_calls(), vec![call]);
        assert_eq!(content.text_content(), "");
    }

    #[test]
    fn test_tool_result_text_content() {
        let call = ToolCall {
            id: "call_7".to_string(),
            name: "lookup".to_string(),
            args: json!({}),
        };
        let content = Content::tool_result(&call, "found it");

        assert_eq!(content.role, Role::Tool);
        assert_eq!(content.text_content(), "found it");
        match &content.parts[0] {
            Part::FunctionResponse { id, name, .. } => {
                assert_eq!(id, "call_7");
                assert_eq!(name, "lookup");
            }
            _ => panic!("Expected FunctionResponse part"),
        }
    }

    #[test]
    fn test_content_serde_shape() {
        let content = Content::user("Hello");
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"role": "user", "parts": [{"text": "Hello"}]}));

        let back: Content = serde_json::from_value(value).unwrap();
        assert_eq!(back, content);
    }
}
