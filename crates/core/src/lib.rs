// SPDX-License-Identifier: MIT

//! Data model and pure domain logic shared by every `claude-host` crate:
//! entities (`Session`, `ExecutorRecord`, `ExecutorKey`, `RichSessionState`),
//! the error taxonomy, and small stateless helpers (ids, slugs, name
//! validation, the opaque agent-event wrapper).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod error;
pub mod executor;
pub mod executor_key;
pub mod id;
pub mod rich;
pub mod session;
pub mod slug;
pub mod time;
pub mod validate;

pub use error::HostError;
pub use executor::{ExecutorRecord, ExecutorStatus};
pub use executor_key::ExecutorKey;
pub use id::{ExecutorId, ExecutorKeyId, IdGen, SequentialIdGen, UserId, UuidIdGen};
pub use rich::{AgentEvent, RichSessionState};
pub use session::{Mode, Session, LOCAL_EXECUTOR_ID};
