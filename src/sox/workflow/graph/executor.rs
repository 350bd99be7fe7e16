//! Workflow graph executor

use std::sync::Arc;

use super::types::{Next, NodeId, NodeOutput, TurnOutcome};
use crate::adk::error::WorkflowError;
use crate::adk::model::Model;
use crate::sox::workflow::registry::ToolRegistry;
use crate::sox::workflow::state::{ConversationState, StateDelta};

pub const DEFAULT_MAX_TOOL_CYCLES: u32 = 5;

/// Runs one turn through Triage → (Main ⇄ Tool | Summarizer)
pub struct WorkflowGraph {
    pub(super) model: Arc<dyn Model>,
    pub(super) tools: Arc<ToolRegistry>,
    max_tool_cycles: u32,
}

impl WorkflowGraph {
    pub fn new(model: Arc<dyn Model>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            max_tool_cycles: DEFAULT_MAX_TOOL_CYCLES,
        }
    }

    pub fn with_max_tool_cycles(mut self, max_tool_cycles: u32) -> Self {
        self.max_tool_cycles = max_tool_cycles;
        self
    }

    pub fn max_tool_cycles(&self) -> u32 {
        self.max_tool_cycles
    }

    async fn execute_node(
        &self,
        node: NodeId,
        state: &ConversationState,
        context: Option<&str>,
    ) -> Result<NodeOutput, WorkflowError> {
        log::info!("Executing node: {}", node);
        match node {
            NodeId::Triage => self.triage(state).await,
            NodeId::Main => self.main(state).await,
            NodeId::Tool => self.tool(state).await,
            NodeId::Summarizer => self.summarizer(state, context).await,
        }
    }

    /// Run one turn.
    ///
    /// `input` is merged into a working copy of `state` before the entry
    /// node runs. Nothing is written anywhere: the returned outcome carries
    /// the accumulated delta for the caller to commit. On error the caller
    /// simply discards the turn.
    pub async fn run(
        &self,
        state: &ConversationState,
        input: StateDelta,
        context: Option<&str>,
    ) -> Result<TurnOutcome, WorkflowError> {
        let mut working = state.clone();
        working.apply(input.clone())?;

        let mut delta = input;
        let mut visited = Vec::new();
        let mut tool_cycles = 0;
        let mut node = NodeId::ENTRY;

        loop {
            visited.push(node);

            let output = self.execute_node(node, &working, context).await?;
            working.apply(output.delta.clone())?;
            delta.merge(output.delta);

            let next = match output.goto {
                Some(next) => next,
                None => node
                    .edge()
                    .resolve(&working)
                    .ok_or_else(|| WorkflowError::MissingRoute(node.to_string()))?,
            };

            node = match next {
                Next::End => break,
                Next::Node(NodeId::Tool) if tool_cycles >= self.max_tool_cycles => {
                    log::error!(
                        "Aborting turn: model requested tools after {} cycle(s)",
                        tool_cycles
                    );
                    return Err(WorkflowError::ToolLoopExceeded {
                        limit: self.max_tool_cycles,
                    });
                }
                Next::Node(NodeId::Tool) => {
                    tool_cycles += 1;
                    NodeId::Tool
                }
                Next::Node(next) => next,
            };
        }

        log::info!("Turn finished after {:?}", visited);
        Ok(TurnOutcome {
            state: working,
            delta,
            visited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelError;
    use crate::adk::model::scripted::{Capability, ScriptedModel, ScriptedReply};
    use crate::adk::model::{Content, Role};
    use crate::sox::tools::MemoryReplySink;
    use crate::sox::workflow::registry::BAD_TOOL_NAME;
    use crate::sox::workflow::state::{Bootstrap, Profile};
    use serde_json::json;

    fn bootstrapped() -> ConversationState {
        let mut state = ConversationState::default();
        state
            .apply(StateDelta::with_bootstrap(Bootstrap {
                subject: "Lunch".to_string(),
                email_session: "Alice: Hi\nBob: Hello".to_string(),
                user_profile: Profile {
                    full_name: "Alice".to_string(),
                    email_address: "alice@example.com".to_string(),
                    phone_number: "555-0100".to_string(),
                },
                contact_profile: Profile {
                    full_name: "Bob".to_string(),
                    email_address: "bob@example.com".to_string(),
                    phone_number: "555-0199".to_string(),
                },
            }))
            .unwrap();
        state
    }

    fn graph(model: Arc<ScriptedModel>) -> (WorkflowGraph, Arc<MemoryReplySink>) {
        let sink = Arc::new(MemoryReplySink::new());
        let registry = Arc::new(ToolRegistry::builtin(sink.clone()));
        (WorkflowGraph::new(model, registry), sink)
    }

    fn user(text: &str) -> StateDelta {
        StateDelta::with_message(Content::user(text))
    }

    #[tokio::test]
    async fn test_main_route_skips_summarizer() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedModel::text("Happy to help."),
        ]));
        let (graph, _) = graph(model.clone());

        let outcome = graph
            .run(&bootstrapped(), user("Hi Sox"), None)
            .await
            .unwrap();

        assert_eq!(outcome.visited, vec![NodeId::Triage, NodeId::Main]);
        assert_eq!(outcome.reply().as_deref(), Some("Happy to help."));
        assert_eq!(outcome.delta.messages.len(), 2);

        let capabilities: Vec<Capability> =
            model.calls().await.iter().map(|c| c.capability).collect();
        assert_eq!(capabilities, vec![Capability::Structured, Capability::Tools]);
    }

    #[tokio::test]
    async fn test_summarize_route_skips_main() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("SUMMARIZE"),
            ScriptedModel::text("Bob said hello."),
        ]));
        let (graph, _) = graph(model.clone());

        let outcome = graph
            .run(&bootstrapped(), user("Summarize please"), Some("Keep it short"))
            .await
            .unwrap();

        assert_eq!(outcome.visited, vec![NodeId::Triage, NodeId::Summarizer]);
        assert_eq!(outcome.reply().as_deref(), Some("Bob said hello."));

        let calls = model.calls().await;
        assert_eq!(calls[1].capability, Capability::Text);
        let prompt = calls[1].history[0].text_content();
        assert!(prompt.contains("< Context >\nKeep it short\n</ Context >"));
    }

    #[tokio::test]
    async fn test_tool_loop_runs_one_cycle() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedModel::tool_call(
                "call_1",
                "write_reply_to_file",
                json!({"content": "Sounds good"}),
            ),
            ScriptedModel::text("Draft saved."),
        ]));
        let (graph, sink) = graph(model);

        let outcome = graph
            .run(&bootstrapped(), user("Reply to Bob"), None)
            .await
            .unwrap();

        assert_eq!(
            outcome.visited,
            vec![NodeId::Triage, NodeId::Main, NodeId::Tool, NodeId::Main]
        );
        let roles: Vec<Role> = outcome.delta.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert!(outcome.state.pending_tool_calls.is_empty());
        assert_eq!(outcome.reply().as_deref(), Some("Draft saved."));
        assert_eq!(sink.drafts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_multiple_calls_answered_in_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedReply::ToolCalls(vec![
                crate::adk::model::ToolCall {
                    id: "a".to_string(),
                    name: "does_not_exist".to_string(),
                    args: json!({}),
                },
                crate::adk::model::ToolCall {
                    id: "b".to_string(),
                    name: "write_reply_to_file".to_string(),
                    args: json!({"content": "Yes"}),
                },
            ]),
            ScriptedModel::text("Done."),
        ]));
        let (graph, _) = graph(model);

        let outcome = graph
            .run(&bootstrapped(), user("Reply yes"), None)
            .await
            .unwrap();

        let tool_entries: Vec<&Content> = outcome
            .delta
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_entries.len(), 2);
        assert_eq!(tool_entries[0].text_content(), BAD_TOOL_NAME);
        assert!(tool_entries[1]
            .text_content()
            .starts_with("Successfully wrote a reply"));
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_to_main() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedModel::tool_call("call_1", "send_fax", json!({})),
            ScriptedModel::text("Sorry, I can't fax."),
        ]));
        let (graph, _) = graph(model);

        let outcome = graph
            .run(&bootstrapped(), user("Fax Bob"), None)
            .await
            .unwrap();

        assert_eq!(outcome.delta.messages[2].text_content(), BAD_TOOL_NAME);
        assert_eq!(outcome.visited.last(), Some(&NodeId::Main));
        assert_eq!(outcome.reply().as_deref(), Some("Sorry, I can't fax."));
    }

    #[tokio::test]
    async fn test_unexpected_classification_aborts() {
        let model = Arc::new(ScriptedModel::new(vec![ScriptedModel::route("ESCALATE")]));
        let (graph, _) = graph(model);

        let err = graph
            .run(&bootstrapped(), user("??"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnexpectedClassification(_)));
    }

    #[tokio::test]
    async fn test_tool_loop_bound() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedModel::tool_call("c1", "write_reply_to_file", json!({"content": "1"})),
            ScriptedModel::tool_call("c2", "write_reply_to_file", json!({"content": "2"})),
        ]));
        let (graph, sink) = graph(model);
        let graph = graph.with_max_tool_cycles(1);

        let err = graph
            .run(&bootstrapped(), user("Loop"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::ToolLoopExceeded { limit: 1 }));
        assert_eq!(sink.drafts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedReply::Fail("timeout".to_string()),
        ]));
        let (graph, _) = graph(model);

        let err = graph
            .run(&bootstrapped(), user("Hi"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Model(ModelError::Api { .. })));
    }

    #[tokio::test]
    async fn test_missing_bootstrap() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let (graph, _) = graph(model.clone());

        let err = graph
            .run(&ConversationState::default(), user("Hi"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingBootstrap));
        assert!(model.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_input_state_is_not_mutated() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::route("MAIN"),
            ScriptedModel::text("ok"),
        ]));
        let (graph, _) = graph(model);
        let before = bootstrapped();

        let outcome = graph.run(&before, user("Hi"), None).await.unwrap();

        assert!(before.messages.is_empty());
        assert_eq!(outcome.state.messages.len(), 2);
        assert_eq!(outcome.state.bootstrap, before.bootstrap);
    }
}
