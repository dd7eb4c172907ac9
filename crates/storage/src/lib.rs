// SPDX-License-Identifier: MIT

//! Durable persistence: atomic snapshot writes, the `MetadataStore`
//! reference implementation, and the rich-session durable event log.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod metadata;
pub mod rich_log;
pub mod snapshot;

pub use error::StorageError;
pub use metadata::{FileMetadataStore, MaterializedState, MetadataStore, FLUSH_DEBOUNCE};
pub use rich_log::RichEventLog;
