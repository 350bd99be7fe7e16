// SPDX-License-Identifier: MIT

//! Mock model - canned replies for offline runs
//!
//! Text replies echo the last user entry. Structured replies are built from
//! the requested schema: enum properties take the preferred label when it is
//! listed, plain strings become `Mock_<key>`. Tools are never called.

use super::{Content, Model, OutputSchema, Role, ToolDeclaration};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub const DEFAULT_LABEL: &str = "MAIN";

pub struct MockModel {
    preferred_label: String,
}

impl MockModel {
    pub fn new() -> Self {
        Self::with_label(DEFAULT_LABEL)
    }

    /// Mock that picks `label` whenever an enum offers it
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            preferred_label: label.into(),
        }
    }

    fn reply_to(history: &[Content]) -> String {
        match history.last() {
            None => "Hello! How can I help you today?".to_string(),
            Some(last) if last.role == Role::User => {
                format!("Mock response to: {}", last.text_content())
            }
            Some(_) => "I'm here to help! What would you like to know?".to_string(),
        }
    }

    fn fill(&self, key: &str, schema: &Value) -> Value {
        if let Some(options) = schema["enum"].as_array() {
            return options
                .iter()
                .find(|o| o.as_str() == Some(self.preferred_label.as_str()))
                .or_else(|| options.first())
                .cloned()
                .unwrap_or(Value::Null);
        }

        match schema["type"].as_str() {
            Some("object") => {
                let mut object = Map::new();
                if let Some(properties) = schema["properties"].as_object() {
                    for (name, property) in properties {
                        object.insert(name.clone(), self.fill(name, property));
                    }
                }
                Value::Object(object)
            }
            Some("array") => json!([]),
            Some("boolean") => json!(false),
            Some("integer") | Some("number") => json!(0),
            _ => json!(format!("Mock_{}", key)),
        }
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(&self, history: &[Content]) -> Result<String, ModelError> {
        Ok(Self::reply_to(history))
    }

    async fn generate_structured(
        &self,
        _history: &[Content],
        schema: &OutputSchema,
    ) -> Result<Value, ModelError> {
        Ok(self.fill(&schema.name, &schema.schema))
    }

    async fn generate_with_tools(
        &self,
        history: &[Content],
        _tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError> {
        Ok(Content::assistant(Self::reply_to(history)))
    }
}
