// SPDX-License-Identifier: MIT

//! Wall-clock helpers. All timestamps in the data model are whole seconds
//! since the epoch (spec §3).

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as integer seconds since the epoch.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
