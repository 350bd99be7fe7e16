//! Anthropic Model - Claude API implementation
//!
//! Structured output is implemented by forcing a single tool whose input
//! schema is the requested output schema.
//!
//! The API rejects `tool_use`/`tool_result` blocks in requests that do not
//! declare tools, so text and structured calls send earlier tool traffic as
//! plain text.

use super::{
    Content, GenerationConfig, Model, OutputSchema, Part, Role, Timeouts, ToolDeclaration,
};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::env;

const PROVIDER: &str = "anthropic";

/// Anthropic Claude model implementation
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    config: GenerationConfig,
}

impl AnthropicModel {
    /// Create a new AnthropicModel
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    /// Optionally uses `ANTHROPIC_BASE_URL` for custom endpoints.
    pub fn new(
        model_name: String,
        config: GenerationConfig,
        timeouts: Timeouts,
    ) -> Result<Self, ModelError> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing(PROVIDER.to_string()))?;
        let base_url = env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string());

        Self::with_endpoint(api_key, base_url, model_name, config, timeouts)
    }

    /// Create a model against an explicit endpoint, bypassing the environment
    pub fn with_endpoint(
        api_key: String,
        base_url: String,
        model_name: String,
        config: GenerationConfig,
        timeouts: Timeouts,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model_name,
            base_url,
            config,
        })
    }

    /// Collect every system entry into the top-level system prompt
    fn extract_system_prompt(history: &[Content]) -> Option<String> {
        let system: Vec<String> = history
            .iter()
            .filter(|c| c.role == Role::System)
            .map(Content::text_content)
            .filter(|t| !t.is_empty())
            .collect();

        if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        }
    }

    /// Convert internal Content to Anthropic message format.
    ///
    /// With `native_tools` off, tool calls and results become text blocks.
    fn content_to_anthropic_message(content: &Content, native_tools: bool) -> Option<Value> {
        let role = match content.role {
            Role::System => return None,
            Role::User | Role::Tool => "user",
            Role::Assistant => "assistant",
        };

        let message_content: Vec<Value> = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(t) => json!({
                    "type": "text",
                    "text": t
                }),
                Part::FunctionCall { id, name, args } if native_tools => json!({
                    "type": "tool_use",
                    "id": id,
                    "name": name,
                    "input": args
                }),
                Part::FunctionResponse { id, response, .. } if native_tools => json!({
                    "type": "tool_result",
                    "tool_use_id": id,
                    "content": response
                }),
                Part::FunctionCall { name, args, .. } => json!({
                    "type": "text",
                    "text": format!("[Called tool {} with {}]", name, args)
                }),
                Part::FunctionResponse { name, response, .. } => json!({
                    "type": "text",
                    "text": format!("[Tool {} returned]\n{}", name, response)
                }),
            })
            .collect();

        if message_content.is_empty() {
            return None;
        }

        Some(json!({
            "role": role,
            "content": message_content
        }))
    }

    /// Convert tool declarations to Anthropic tool format
    fn tools_to_anthropic_format(tools: &[ToolDeclaration]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters
                })
            })
            .collect()
    }

    /// Parse Anthropic response into an assistant Content
    fn parse_anthropic_response(response: &Value) -> Result<Content, ModelError> {
        let content_blocks = response["content"]
            .as_array()
            .ok_or_else(|| ModelError::invalid_response("No content in Anthropic response"))?;

        let mut parts = Vec::new();

        for block in content_blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        if !text.is_empty() {
                            parts.push(Part::Text(text.to_string()));
                        }
                    }
                }
                Some("tool_use") => {
                    let id = block["id"]
                        .as_str()
                        .ok_or_else(|| ModelError::invalid_response("tool_use block without id"))?;
                    let name = block["name"].as_str().ok_or_else(|| {
                        ModelError::invalid_response("tool_use block without name")
                    })?;

                    parts.push(Part::FunctionCall {
                        id: id.to_string(),
                        name: name.to_string(),
                        args: block["input"].clone(),
                    });
                }
                _ => {}
            }
        }

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Content {
            role: Role::Assistant,
            parts,
        })
    }

    fn build_body(&self, history: &[Content], native_tools: bool) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .filter_map(|c| Self::content_to_anthropic_message(c, native_tools))
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": self.config.max_output_tokens.unwrap_or(4096)
        });

        if let Some(sys) = Self::extract_system_prompt(history) {
            body["system"] = json!(sys);
        }
        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(top_p) = self.config.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(top_k) = self.config.top_k {
            body["top_k"] = json!(top_k);
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<Content, ModelError> {
        let url = format!("{}/messages", self.base_url);

        log::debug!(
            "Anthropic request body: {}",
            serde_json::to_string_pretty(body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ModelError::api(PROVIDER, format!("{}: {}", status, text)));
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("Anthropic response: {}", resp_json);

        Self::parse_anthropic_response(&resp_json)
    }

    /// Pull the forced tool's input out of a structured-output reply
    fn extract_structured(content: &Content, schema_name: &str) -> Result<Value, ModelError> {
        content
            .tool_calls()
            .into_iter()
            .find(|call| call.name == schema_name)
            .map(|call| call.args)
            .ok_or_else(|| {
                ModelError::invalid_response(format!(
                    "structured reply did not use '{}'",
                    schema_name
                ))
            })
    }
}

#[async_trait]
impl Model for AnthropicModel {
    async fn generate_text(&self, history: &[Content]) -> Result<String, ModelError> {
        let body = self.build_body(history, false);
        let content = self.send(&body).await?;
        Ok(content.text_content())
    }

    async fn generate_structured(
        &self,
        history: &[Content],
        schema: &OutputSchema,
    ) -> Result<Value, ModelError> {
        let mut body = self.build_body(history, false);
        body["tools"] = json!([{
            "name": schema.name,
            "description": schema.description,
            "input_schema": schema.schema
        }]);
        body["tool_choice"] = json!({"type": "tool", "name": schema.name});

        let content = self.send(&body).await?;
        Self::extract_structured(&content, &schema.name)
    }

    async fn generate_with_tools(
        &self,
        history: &[Content],
        tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError> {
        let mut body = self.build_body(history, !tools.is_empty());
        if !tools.is_empty() {
            body["tools"] = json!(Self::tools_to_anthropic_format(tools));
            log::info!(
                "Binding {} tool(s) for Anthropic: {:?}",
                tools.len(),
                tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
            );
        }

        self.send(&body).await
    }
}
