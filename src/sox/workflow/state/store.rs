// SPDX-License-Identifier: MIT

//! Conversation state with its reducer

use serde::{Deserialize, Serialize};

use super::schema::{Bootstrap, StateDelta};
use crate::adk::error::StateError;
use crate::adk::model::{Content, ToolCall};

/// The record threaded through every workflow node
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Content>,
    #[serde(default)]
    pub bootstrap: Option<Bootstrap>,
    #[serde(default)]
    pub pending_tool_calls: Vec<ToolCall>,
}

impl ConversationState {
    /// Merge a delta into the state.
    ///
    /// Validation happens before any mutation, so a rejected delta leaves
    /// the state untouched.
    pub fn apply(&mut self, delta: StateDelta) -> Result<(), StateError> {
        if delta.bootstrap.is_some() && self.bootstrap.is_some() {
            return Err(StateError::BootstrapAlreadySet);
        }

        if let Some(bootstrap) = delta.bootstrap {
            self.bootstrap = Some(bootstrap);
        }
        self.messages.extend(delta.messages);
        if let Some(pending) = delta.pending_tool_calls {
            self.pending_tool_calls = pending;
        }
        Ok(())
    }

    pub fn bootstrap(&self) -> Option<&Bootstrap> {
        self.bootstrap.as_ref()
    }

    pub fn last_message(&self) -> Option<&Content> {
        self.messages.last()
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        !self.pending_tool_calls.is_empty()
    }
}
