// SPDX-License-Identifier: MIT

//! Host-side process adapters: the `TmuxRunner` trait (C1) and its real and
//! fake implementations, plus the stateless helpers layered on top of it —
//! agent session id injection, job launcher scripts, fork-hook resolution,
//! and analyze/summarize probes.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod agent_session;
pub mod error;
pub mod fork;
pub mod jobs;
pub mod probe;
pub mod runner;
pub mod tmux;

#[cfg(feature = "test-support")]
pub mod fake;

pub use error::AdapterError;
pub use runner::{CreatedWindow, ForkRequest, TmuxRunner, WindowLiveness, INITIAL_COLS, INITIAL_ROWS};
pub use tmux::RealTmuxRunner;

#[cfg(feature = "test-support")]
pub use fake::FakeTmuxRunner;
