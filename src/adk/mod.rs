// SPDX-License-Identifier: MIT

//! Agent development kit: model port, tool trait and error types

pub mod error;
pub mod model;
pub mod tool;
