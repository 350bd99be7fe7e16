// SPDX-License-Identifier: MIT

//! Conversation workflow graph
//!
//! An explicit state machine over four nodes. Triage routes to Main or
//! Summarizer; Main loops through Tool while the model keeps requesting
//! tools; Summarizer ends the turn.

pub mod executor;
mod nodes;
pub mod types;

pub use executor::{WorkflowGraph, DEFAULT_MAX_TOOL_CYCLES};
pub use nodes::Route;
pub use types::{Edge, Next, NodeId, NodeOutput, TurnOutcome};
