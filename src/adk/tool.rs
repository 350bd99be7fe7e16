use crate::adk::error::ToolError;
use crate::adk::model::ToolDeclaration;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools that can be called by the model.
///
/// `S` is the state injected into every invocation alongside the
/// model-supplied arguments. The model never sees it in the schema.
///
/// `name()`, `description()` and `schema()` return borrowed data;
/// implementations store them in fields or statics.
#[async_trait]
pub trait Tool<S: Sync>: Send + Sync {
    /// Returns the tool name (must be unique within a registry)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and injected state
    async fn execute(&self, input: Value, state: &S) -> Result<String, ToolError>;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema().clone(),
        }
    }
}
