// SPDX-License-Identifier: MIT

//! The `ExecutorRecord` entity (spec §3).

use crate::session::LOCAL_EXECUTOR_ID;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorRecord {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    pub labels: BTreeSet<String>,
    pub status: ExecutorStatus,
    pub last_seen: i64,
    pub version: Option<String>,
}

impl ExecutorRecord {
    /// The `"local"` record is always online and owned by nobody in
    /// particular — every authenticated user may target it.
    pub fn local(now: i64) -> Self {
        Self {
            id: LOCAL_EXECUTOR_ID.to_string(),
            owner_user_id: String::new(),
            name: "local".to_string(),
            labels: BTreeSet::new(),
            status: ExecutorStatus::Online,
            last_seen: now,
            version: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.id == LOCAL_EXECUTOR_ID
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.is_local() || self.owner_user_id == user_id
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
