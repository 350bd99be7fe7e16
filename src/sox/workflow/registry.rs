// SPDX-License-Identifier: MIT

use crate::adk::model::ToolDeclaration;
use crate::adk::tool::Tool;
use crate::sox::tools::{BuiltinTool, ReplySink};
use crate::sox::workflow::state::ConversationState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Result text handed back to the model when it names an unknown tool
pub const BAD_TOOL_NAME: &str = "bad tool name, retry";

/// Name-keyed tool set, populated at startup and shared read-only after
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool<ConversationState>>>,
    /// Registration order, so declarations are stable across turns
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in tool, drafting into `sink`
    pub fn builtin(sink: Arc<dyn ReplySink>) -> Self {
        let mut registry = Self::new();
        for tool in BuiltinTool::ALL {
            log::info!("Registered tool: {}", tool.name());
            registry.register(tool.build(sink.clone()));
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool<ConversationState>>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool<ConversationState>>> {
        self.tools.get(name)
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.declaration())
            .collect()
    }

    /// Invoke a tool by name. Never fails: unknown names and tool errors
    /// come back as text for the model to react to.
    pub async fn invoke(&self, name: &str, args: Value, state: &ConversationState) -> String {
        let Some(tool) = self.get(name) else {
            log::warn!("Tool {} not found", name);
            return BAD_TOOL_NAME.to_string();
        };

        match tool.execute(args, state).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Tool {} failed: {}", name, e);
                format!("Tool {} failed: {}", name, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ToolError;
    use crate::sox::tools::MemoryReplySink;
    use async_trait::async_trait;
    use once_cell::sync::Lazy;
    use serde_json::json;

    static MOCK_SCHEMA: Lazy<Value> = Lazy::new(|| {
        json!({
            "type": "object",
            "properties": {}
        })
    });

    /// A mock tool for testing
    struct MockTool {
        name: String,
        description: String,
        fail: bool,
    }

    impl MockTool {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                description: format!("Mock tool: {}", name),
                fail: false,
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                fail: true,
                ..Self::new(name)
            }
        }
    }

    #[async_trait]
    impl Tool<ConversationState> for MockTool {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            &self.description
        }

        fn schema(&self) -> &Value {
            &MOCK_SCHEMA
        }

        async fn execute(
            &self,
            input: Value,
            state: &ConversationState,
        ) -> Result<String, ToolError> {
            if self.fail {
                return Err(ToolError::Failed("disk full".to_string()));
            }
            Ok(format!("{} saw {} message(s) and {}", self.name, state.messages.len(), input))
        }
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("echo")));

        let result = registry
            .invoke("echo", json!({"a": 1}), &ConversationState::default())
            .await;
        assert_eq!(result, r#"echo saw 0 message(s) and {"a":1}"#);
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_retry_text() {
        let registry = ToolRegistry::new();
        let result = registry
            .invoke("nonexistent", json!({}), &ConversationState::default())
            .await;
        assert_eq!(result, BAD_TOOL_NAME);
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_text() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::failing("flaky")));

        let result = registry
            .invoke("flaky", json!({}), &ConversationState::default())
            .await;
        assert_eq!(result, "Tool flaky failed: disk full");
    }

    #[test]
    fn test_declarations_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("tool2")));
        registry.register(Arc::new(MockTool::new("tool1")));
        registry.register(Arc::new(MockTool::new("tool2")));

        let names: Vec<String> = registry
            .declarations()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["tool2", "tool1"]);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ToolRegistry::builtin(Arc::new(MemoryReplySink::new()));
        assert!(registry.get("write_reply_to_file").is_some());
        assert!(registry.get("send_email").is_none());

        let declarations = registry.declarations();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].parameters["required"], json!(["content"]));
    }
}
