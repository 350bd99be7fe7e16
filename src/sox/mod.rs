// SPDX-License-Identifier: MIT

pub mod config;
pub mod prompts;
pub mod session;
pub mod tools;
pub mod workflow;
