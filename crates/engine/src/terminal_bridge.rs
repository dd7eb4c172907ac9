// SPDX-License-Identifier: MIT

//! `TerminalBridge` (C2): attaches one pseudo-terminal per session and
//! shares it across multiple client sockets, negotiating a single viewport
//! as the componentwise minimum over all attached clients (spec §4.2).

use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::EngineError;

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

/// Opaque per-socket identity within a terminal share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

impl ClientId {
    pub fn next() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy)]
struct Viewport {
    cols: u16,
    rows: u16,
}

struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    writer: Mutex<Box<dyn Write + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
}

/// The live pty and the set of clients attached to it.
struct Share {
    pty: PtyHandle,
    clients: Mutex<HashMap<ClientId, Viewport>>,
    output: broadcast::Sender<Vec<u8>>,
}

impl Share {
    fn min_viewport(&self) -> (u16, u16) {
        let clients = self.clients.lock();
        if clients.is_empty() {
            return (DEFAULT_COLS, DEFAULT_ROWS);
        }
        let cols = clients.values().map(|v| v.cols).min().unwrap_or(DEFAULT_COLS);
        let rows = clients.values().map(|v| v.rows).min().unwrap_or(DEFAULT_ROWS);
        (cols, rows)
    }

    fn resize_to_min(&self) -> Result<(), EngineError> {
        let (cols, rows) = self.min_viewport();
        self.pty
            .master
            .resize(PtySize {
                cols,
                rows,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| EngineError::Host(chost_core::HostError::IoFailure(e.to_string())))
    }
}

/// Shares pseudo-terminals across client sockets, one per session name.
/// The map is independently `Arc`'d so the blocking reader thread can
/// remove its own share on pty EOF without holding a reference back to
/// the bridge itself.
pub struct TerminalBridge {
    shares: Arc<Mutex<HashMap<String, Arc<Share>>>>,
}

impl Default for TerminalBridge {
    fn default() -> Self {
        Self {
            shares: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl TerminalBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `client_id` to `session_name`'s pty, spawning it via
    /// `attach_command` (e.g. `tmux attach -t <name>`) if this is the first
    /// client. Returns a broadcast receiver for pty output.
    pub fn attach(
        &self,
        session_name: &str,
        client_id: ClientId,
        cols: u16,
        rows: u16,
        attach_command: &str,
    ) -> Result<broadcast::Receiver<Vec<u8>>, EngineError> {
        let mut shares = self.shares.lock();

        if let Some(share) = shares.get(session_name) {
            share.clients.lock().insert(client_id, Viewport { cols, rows });
            share.resize_to_min()?;
            return Ok(share.output.subscribe());
        }

        let share = Arc::new(spawn_share(attach_command, cols, rows)?);
        share.clients.lock().insert(client_id, Viewport { cols, rows });
        let receiver = share.output.subscribe();
        spawn_reader(Arc::clone(&self.shares), session_name.to_string(), Arc::clone(&share));
        shares.insert(session_name.to_string(), share);
        Ok(receiver)
    }

    /// Client-provided `{resize:[cols,rows]}`: updates that client's
    /// viewport and recomputes the shared minimum.
    pub fn resize(&self, session_name: &str, client_id: ClientId, cols: u16, rows: u16) -> Result<(), EngineError> {
        let shares = self.shares.lock();
        let share = shares
            .get(session_name)
            .ok_or_else(|| EngineError::Host(chost_core::HostError::NotFound(session_name.to_string())))?;
        share.clients.lock().insert(client_id, Viewport { cols, rows });
        share.resize_to_min()
    }

    /// Any other client payload: written unchanged to the pty.
    pub fn write_input(&self, session_name: &str, data: &[u8]) -> Result<(), EngineError> {
        let shares = self.shares.lock();
        let share = shares
            .get(session_name)
            .ok_or_else(|| EngineError::Host(chost_core::HostError::NotFound(session_name.to_string())))?;
        share
            .pty
            .writer
            .lock()
            .write_all(data)
            .map_err(|e| EngineError::Host(chost_core::HostError::IoFailure(e.to_string())))
    }

    /// Detach a client. If the set becomes empty, the pty is killed and the
    /// share discarded; otherwise the minimum viewport is recomputed.
    pub fn detach(&self, session_name: &str, client_id: ClientId) -> Result<(), EngineError> {
        let mut shares = self.shares.lock();
        let Some(share) = shares.get(session_name).cloned() else {
            return Ok(());
        };

        let now_empty = {
            let mut clients = share.clients.lock();
            clients.remove(&client_id);
            clients.is_empty()
        };

        if now_empty {
            let _ = share.pty.child.lock().kill();
            shares.remove(session_name);
        } else {
            share.resize_to_min()?;
        }
        Ok(())
    }

    pub fn is_attached(&self, session_name: &str) -> bool {
        self.shares.lock().contains_key(session_name)
    }

    /// Kill the pty and discard the share regardless of attached clients,
    /// used on session delete.
    pub fn force_close(&self, session_name: &str) {
        if let Some(share) = self.shares.lock().remove(session_name) {
            let _ = share.pty.child.lock().kill();
        }
    }
}

fn spawn_share(attach_command: &str, cols: u16, rows: u16) -> Result<Share, EngineError> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            cols,
            rows,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| EngineError::Host(chost_core::HostError::IoFailure(e.to_string())))?;

    let mut cmd = CommandBuilder::new("sh");
    cmd.args(["-c", attach_command]);

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| EngineError::Host(chost_core::HostError::SpawnFailure(e.to_string())))?;

    let writer = pair
        .master
        .take_writer()
        .map_err(|e| EngineError::Host(chost_core::HostError::IoFailure(e.to_string())))?;

    let (tx, _rx) = broadcast::channel(1024);

    Ok(Share {
        pty: PtyHandle {
            master: pair.master,
            writer: Mutex::new(writer),
            child: Mutex::new(child),
        },
        clients: Mutex::new(HashMap::new()),
        output: tx,
    })
}

/// Pump pty output into the share's broadcast channel. Runs on a blocking
/// thread since `portable_pty`'s reader is synchronous; when the pty exits
/// (EOF or read error) it kills the child, drops the share from the map,
/// and lets the dropped `output` sender close every attached client socket
/// (spec §4.2: "if the pty exits, close every client socket and discard
/// the share").
fn spawn_reader(shares: Arc<Mutex<HashMap<String, Arc<Share>>>>, session_name: String, share: Arc<Share>) {
    std::thread::spawn(move || {
        let mut reader = match share.pty.master.try_clone_reader() {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "failed to clone pty reader");
                return;
            }
        };
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if share.output.send(buf[..n].to_vec()).is_err() {
                        // no receivers left; keep draining until EOF so the
                        // child doesn't block on a full pipe
                        continue;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "pty read error");
                    break;
                }
            }
        }

        let _ = share.pty.child.lock().kill();
        shares.lock().remove(&session_name);
    });
}

#[cfg(test)]
#[path = "terminal_bridge_tests.rs"]
mod tests;
