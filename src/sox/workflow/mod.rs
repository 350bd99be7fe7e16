// SPDX-License-Identifier: MIT

pub mod checkpoint;
pub mod graph;
pub mod registry;
pub mod state;
