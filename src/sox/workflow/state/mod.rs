// SPDX-License-Identifier: MIT

//! State management for the conversation workflow
//!
//! This module provides:
//! - `ConversationState` - the per-thread record with its reducer
//! - `StateDelta` - updates produced by nodes and merged by stores
//! - `Bootstrap` / `Profile` - the write-once conversation context

mod schema;
mod store;

pub use schema::{Bootstrap, Profile, StateDelta};
pub use store::ConversationState;
