// SPDX-License-Identifier: MIT

//! Conversation state field types and the delta passed between nodes

use crate::adk::model::{Content, ToolCall};
use serde::{Deserialize, Serialize};

/// One human party of the email exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub full_name: String,
    pub email_address: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Write-once context established at bootstrap
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bootstrap {
    pub subject: String,
    /// Flattened transcript of the email exchange
    pub email_session: String,
    pub user_profile: Profile,
    pub contact_profile: Profile,
}

/// An update to conversation state
///
/// Messages are appended, bootstrap is write-once, and pending tool calls
/// are replaced wholesale when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<Bootstrap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tool_calls: Option<Vec<ToolCall>>,
}

impl StateDelta {
    pub fn with_bootstrap(bootstrap: Bootstrap) -> Self {
        Self {
            bootstrap: Some(bootstrap),
            ..Self::default()
        }
    }

    pub fn with_message(message: Content) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bootstrap.is_none() && self.messages.is_empty() && self.pending_tool_calls.is_none()
    }

    /// Fold a later delta into this one, as if both were applied in order
    pub fn merge(&mut self, later: StateDelta) {
        if later.bootstrap.is_some() {
            self.bootstrap = later.bootstrap;
        }
        self.messages.extend(later.messages);
        if later.pending_tool_calls.is_some() {
            self.pending_tool_calls = later.pending_tool_calls;
        }
    }
}
