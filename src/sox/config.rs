// SPDX-License-Identifier: MIT

//! Runtime configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adk::error::SoxError;
use crate::adk::model::anthropic::AnthropicModel;
use crate::adk::model::mock::MockModel;
use crate::adk::model::{GenerationConfig, Model, Timeouts};
use crate::sox::workflow::checkpoint::SqliteCheckpointStore;
use crate::sox::workflow::graph::DEFAULT_MAX_TOOL_CYCLES;

pub const DEFAULT_MODEL_NAME: &str = "claude-3-haiku-20240307";
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    /// `anthropic`, or `mock` (aliases `dummy`, `local`) for offline runs
    pub provider: String,
    pub model_name: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub connect_timeout_secs: u64,
    /// Upper bound on one provider call; a hung call fails the turn
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            temperature: None,
            max_output_tokens: None,
            top_p: None,
            top_k: None,
            connect_timeout_secs: 120,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoxConfig {
    /// Identifier of the party Sox works for
    pub self_id: String,
    pub model: ModelSettings,
    pub max_tool_cycles: u32,
    pub checkpoint_path: String,
    pub draft_path: PathBuf,
}

impl Default for SoxConfig {
    fn default() -> Self {
        Self {
            self_id: String::new(),
            model: ModelSettings::default(),
            max_tool_cycles: DEFAULT_MAX_TOOL_CYCLES,
            checkpoint_path: "checkpoints.sqlite".to_string(),
            draft_path: PathBuf::from("draft.txt"),
        }
    }
}

impl SoxConfig {
    /// Read the YAML file (if any), apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, SoxError> {
        let mut config = match path {
            Some(path) => Self::parse_yaml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, SoxError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override fields from `lookup`, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SOX_SELF_ID") {
            self.self_id = v;
        }
        if let Some(v) = lookup("MODEL_PROVIDER") {
            self.model.provider = v;
        }
        if let Some(v) = lookup("MODEL_NAME") {
            self.model.model_name = v;
        }
        if let Some(v) = lookup("SOX_CHECKPOINT_DB") {
            self.checkpoint_path = v;
        }
        if let Some(v) = lookup("SOX_DRAFT_PATH") {
            self.draft_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SOX_MAX_TOOL_CYCLES") {
            self.max_tool_cycles = v.parse().map_err(|_| {
                SoxError::config(format!("SOX_MAX_TOOL_CYCLES must be a number, got '{}'", v))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SoxError> {
        if self.self_id.trim().is_empty() {
            return Err(SoxError::config(
                "self_id is not set (config file or SOX_SELF_ID)",
            ));
        }
        if self.model.connect_timeout_secs == 0 || self.model.request_timeout_secs == 0 {
            return Err(SoxError::config("model timeouts must be at least 1 second"));
        }
        if self.max_tool_cycles == 0 {
            return Err(SoxError::config("max_tool_cycles must be at least 1"));
        }
        Ok(())
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.model.temperature,
            max_output_tokens: self.model.max_output_tokens,
            top_p: self.model.top_p,
            top_k: self.model.top_k,
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.model.connect_timeout_secs),
            request: Duration::from_secs(self.model.request_timeout_secs),
        }
    }

    pub fn build_model(&self) -> Result<Arc<dyn Model>, SoxError> {
        log::info!(
            "Using provider: {} with model: {}",
            self.model.provider,
            self.model.model_name
        );
        match self.model.provider.to_lowercase().as_str() {
            "anthropic" => Ok(Arc::new(AnthropicModel::new(
                self.model.model_name.clone(),
                self.generation_config(),
                self.timeouts(),
            )?)),
            "mock" | "dummy" | "local" => Ok(Arc::new(MockModel::new())),
            other => Err(SoxError::config(format!(
                "Unsupported model provider: {}",
                other
            ))),
        }
    }

    pub fn open_store(&self) -> Result<Arc<SqliteCheckpointStore>, SoxError> {
        let store = if self.checkpoint_path == IN_MEMORY {
            SqliteCheckpointStore::open_in_memory()?
        } else {
            SqliteCheckpointStore::open(&self.checkpoint_path)?
        };
        Ok(Arc::new(store))
    }
}
