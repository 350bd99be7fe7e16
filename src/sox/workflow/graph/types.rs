//! Graph type definitions
//!
//! The graph is fixed: four nodes, one entry point, and an edge table
//! expressed as a match on `NodeId`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adk::model::Content;
use crate::sox::workflow::state::{ConversationState, StateDelta};

/// Identifier of a node in the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Triage,
    Main,
    Tool,
    Summarizer,
}

impl NodeId {
    /// Every turn starts here
    pub const ENTRY: NodeId = NodeId::Triage;

    pub fn as_str(self) -> &'static str {
        match self {
            NodeId::Triage => "triage_node",
            NodeId::Main => "main_node",
            NodeId::Tool => "tool_node",
            NodeId::Summarizer => "summarizer_node",
        }
    }

    /// Outgoing edge of this node
    pub fn edge(self) -> Edge {
        match self {
            NodeId::Triage => Edge::Routed,
            NodeId::Main => Edge::Conditional {
                predicate: ConversationState::has_pending_tool_calls,
                when_true: Next::Node(NodeId::Tool),
                when_false: Next::End,
            },
            NodeId::Tool => Edge::Static(Next::Node(NodeId::Main)),
            NodeId::Summarizer => Edge::Static(Next::End),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where control goes after a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Node(NodeId),
    End,
}

/// Outgoing edge kinds
#[derive(Debug, Clone, Copy)]
pub enum Edge {
    /// Always proceed to the same successor
    Static(Next),
    /// Choose a successor from the state the node left behind
    Conditional {
        predicate: fn(&ConversationState) -> bool,
        when_true: Next,
        when_false: Next,
    },
    /// The node names its successor in its output
    Routed,
}

impl Edge {
    /// Resolve the successor; `None` for routed edges
    pub fn resolve(&self, state: &ConversationState) -> Option<Next> {
        match *self {
            Edge::Static(next) => Some(next),
            Edge::Conditional {
                predicate,
                when_true,
                when_false,
            } => Some(if predicate(state) {
                when_true
            } else {
                when_false
            }),
            Edge::Routed => None,
        }
    }
}

/// What a node hands back to the executor
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    pub delta: StateDelta,
    /// Explicit routing directive, only set by routed nodes
    pub goto: Option<Next>,
}

impl NodeOutput {
    pub fn update(delta: StateDelta) -> Self {
        Self { delta, goto: None }
    }

    pub fn routed(goto: Next) -> Self {
        Self {
            delta: StateDelta::default(),
            goto: Some(goto),
        }
    }
}

/// Result of one completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Working copy after the turn
    pub state: ConversationState,
    /// Everything the turn changed, including its input, to be committed at once
    pub delta: StateDelta,
    /// Nodes in execution order
    pub visited: Vec<NodeId>,
}

impl TurnOutcome {
    /// Content of the last message, the only thing callers see
    pub fn reply(&self) -> Option<String> {
        self.state.last_message().map(Content::text_content)
    }
}
