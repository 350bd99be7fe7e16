// SPDX-License-Identifier: MIT

use crate::adk::error::ToolError;
use crate::adk::tool::Tool;
use crate::sox::workflow::state::{Bootstrap, ConversationState};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const WRITE_REPLY_TOOL_NAME: &str = "write_reply_to_file";

pub const WRITE_FAILED: &str = "Failed to write a reply to a file!";

// --- Static schema ---

static WRITE_REPLY_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": "Draft of reply"
            }
        },
        "required": ["content"]
    })
});

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteReplyArgs {
    pub content: String,
}

/// Destination for drafted replies
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn write(&self, draft: &str) -> io::Result<()>;
}

/// Overwrites a single draft file on every write
pub struct FileReplySink {
    path: PathBuf,
}

impl FileReplySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReplySink for FileReplySink {
    async fn write(&self, draft: &str) -> io::Result<()> {
        tokio::fs::write(&self.path, draft).await
    }
}

/// Keeps every draft in memory
#[derive(Default)]
pub struct MemoryReplySink {
    drafts: Mutex<Vec<String>>,
}

impl MemoryReplySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drafts(&self) -> Vec<String> {
        self.drafts.lock().await.clone()
    }
}

#[async_trait]
impl ReplySink for MemoryReplySink {
    async fn write(&self, draft: &str) -> io::Result<()> {
        self.drafts.lock().await.push(draft.to_string());
        Ok(())
    }
}

/// Formats a reply from the user to the contact and hands it to a sink
pub struct WriteReplyTool {
    sink: Arc<dyn ReplySink>,
}

impl WriteReplyTool {
    pub fn new(sink: Arc<dyn ReplySink>) -> Self {
        Self { sink }
    }

    fn format_draft(bootstrap: &Bootstrap, content: &str) -> String {
        format!(
            "From: {} \n\nTo: {} \n\nSubject: {} \n\nContent: \n\n{}",
            bootstrap.user_profile.email_address,
            bootstrap.contact_profile.email_address,
            bootstrap.subject,
            content
        )
    }
}

#[async_trait]
impl Tool<ConversationState> for WriteReplyTool {
    fn name(&self) -> &str {
        WRITE_REPLY_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Write the email content to the file. Sender, recipient and subject are taken from the \
         conversation; provide only the draft of the reply as `content`."
    }

    fn schema(&self) -> &Value {
        &WRITE_REPLY_SCHEMA
    }

    async fn execute(&self, input: Value, state: &ConversationState) -> Result<String, ToolError> {
        let args: WriteReplyArgs = serde_json::from_value(input)?;

        let Some(bootstrap) = state.bootstrap() else {
            log::error!("write_reply_to_file called on a conversation without bootstrap");
            return Ok(WRITE_FAILED.to_string());
        };

        let draft = Self::format_draft(bootstrap, &args.content);
        match self.sink.write(&draft).await {
            Ok(()) => Ok(format!(
                "Successfully wrote a reply to a file!\n\nHere is email content.\n\n{}",
                draft
            )),
            Err(e) => {
                log::error!("Failed to write reply draft: {}", e);
                Ok(WRITE_FAILED.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sox::workflow::state::{Profile, StateDelta};

    struct BrokenSink;

    #[async_trait]
    impl ReplySink for BrokenSink {
        async fn write(&self, _draft: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    fn state() -> ConversationState {
        let mut state = ConversationState::default();
        state
            .apply(StateDelta::with_bootstrap(Bootstrap {
                subject: "Lunch on Friday".to_string(),
                email_session: "Alice: Hi\nBob: Hello".to_string(),
                user_profile: Profile {
                    full_name: "Alice".to_string(),
                    email_address: "alice@example.com".to_string(),
                    phone_number: String::new(),
                },
                contact_profile: Profile {
                    full_name: "Bob".to_string(),
                    email_address: "bob@example.com".to_string(),
                    phone_number: String::new(),
                },
            }))
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_writes_formatted_draft() {
        let sink = Arc::new(MemoryReplySink::new());
        let tool = WriteReplyTool::new(sink.clone());

        let result = tool
            .execute(json!({"content": "Sounds good"}), &state())
            .await
            .unwrap();

        let expected = "From: alice@example.com \n\nTo: bob@example.com \n\nSubject: Lunch on Friday \n\nContent: \n\nSounds good";
        assert_eq!(sink.drafts().await, vec![expected.to_string()]);
        assert!(result.starts_with("Successfully wrote a reply to a file!"));
        assert!(result.ends_with(expected));
    }

    #[tokio::test]
    async fn test_sink_failure_becomes_text() {
        let tool = WriteReplyTool::new(Arc::new(BrokenSink));
        let result = tool
            .execute(json!({"content": "Sounds good"}), &state())
            .await
            .unwrap();
        assert_eq!(result, WRITE_FAILED);
    }

    #[tokio::test]
    async fn test_missing_bootstrap_becomes_text() {
        let tool = WriteReplyTool::new(Arc::new(MemoryReplySink::new()));
        let result = tool
            .execute(json!({"content": "x"}), &ConversationState::default())
            .await
            .unwrap();
        assert_eq!(result, WRITE_FAILED);
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_errors() {
        let tool = WriteReplyTool::new(Arc::new(MemoryReplySink::new()));
        let err = tool
            .execute(json!({"body": "wrong field"}), &state())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_file_sink_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.txt");
        let sink = FileReplySink::new(&path);

        sink.write("first").await.unwrap();
        sink.write("second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
