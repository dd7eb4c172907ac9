// SPDX-License-Identifier: MIT

//! Durable event log for rich (agent) sessions (spec §4.3.4).
//!
//! Events are appended in memory and marked dirty; a 2-second debounced
//! flush rewrites the full per-session file. `result` events and session
//! close bypass the debounce and flush immediately. On-disk format is
//! newline-delimited JSON, one event per line, insertion-ordered.

use parking_lot::RwLock;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::StorageError;

pub const FLUSH_DEBOUNCE: Duration = crate::metadata::FLUSH_DEBOUNCE;

fn log_path(dir: &Path, session_name: &str) -> PathBuf {
    dir.join(format!("{session_name}.jsonl"))
}

/// A single session's durable event log.
pub struct RichEventLog {
    path: PathBuf,
    events: RwLock<Vec<serde_json::Value>>,
    dirty: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl RichEventLog {
    /// Load an existing log (if present) or start empty. Tolerant of
    /// trailing partial lines from a crash mid-write.
    pub fn open(dir: &Path, session_name: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        let path = log_path(dir, session_name);
        let mut events = Vec::new();

        if path.exists() {
            let file = File::open(&path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str(&line) {
                    Ok(value) => events.push(value),
                    Err(_) => break, // truncated trailing line from a crash mid-write
                }
            }
        }

        Ok(RichEventLog {
            path,
            events: RwLock::new(events),
            dirty: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        })
    }

    /// Snapshot of all persisted events, in insertion order, for replay.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.events.read().clone()
    }

    /// Append an event and mark the log dirty. Does not flush.
    pub fn append(&self, event: serde_json::Value) {
        self.events.write().push(event);
        self.dirty.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Spawn the debounced background flush task. Call once per log;
    /// the returned handle keeps the task alive only as long as it's held.
    pub fn spawn_flush_task(self: &Arc<Self>) {
        let log = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                log.wake.notified().await;
                tokio::time::sleep(FLUSH_DEBOUNCE).await;
                if log.dirty.swap(false, Ordering::SeqCst) {
                    if let Err(e) = log.flush_now() {
                        tracing::error!(error = %e, path = %log.path.display(), "rich event log flush failed");
                    }
                }
            }
        });
    }

    /// Rewrite the whole file now, bypassing the debounce window. Used for
    /// `result` events and session close (spec §4.3.4).
    pub fn flush_now(&self) -> Result<(), StorageError> {
        self.dirty.store(false, Ordering::SeqCst);
        let events = self.events.read();

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            for event in events.iter() {
                serde_json::to_writer(&mut file, event)?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Remove the durable record entirely (session delete, spec §4.3.4).
    pub fn delete(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rich_log_tests.rs"]
mod tests;
