// SPDX-License-Identifier: MIT

//! Built-in tools available to the Main node

pub mod write_reply;

use crate::adk::tool::Tool;
use crate::sox::workflow::state::ConversationState;
use std::sync::Arc;

pub use write_reply::{FileReplySink, MemoryReplySink, ReplySink, WriteReplyTool};

/// The closed set of tools shipped with the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    WriteReply,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 1] = [BuiltinTool::WriteReply];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::WriteReply => write_reply::WRITE_REPLY_TOOL_NAME,
        }
    }

    pub fn build(self, sink: Arc<dyn ReplySink>) -> Arc<dyn Tool<ConversationState>> {
        match self {
            BuiltinTool::WriteReply => Arc::new(WriteReplyTool::new(sink)),
        }
    }
}
