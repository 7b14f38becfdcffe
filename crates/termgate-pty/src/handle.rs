//! Handle to a running PTY process

use std::sync::Arc;

use parking_lot::Mutex;
use portable_pty::{Child, ChildKiller, MasterPty, PtySize};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PtyError, Result};

/// Child process shared between a handle and its waiter thread
pub(crate) type SharedChild = Arc<Mutex<Box<dyn Child + Send + Sync>>>;

/// Lifecycle of a PTY process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "code", rename_all = "lowercase")]
pub enum ProcessState {
    /// Started, I/O threads not yet attached
    Spawned,
    /// Accepting input
    Running,
    /// Exited (or terminated) with an optional status
    Exited(Option<i32>),
}

/// Exclusive handle to one PTY process.
///
/// Dropping a handle whose process is still running kills the process.
pub struct PtyHandle {
    id: Uuid,
    pid: Option<u32>,
    state: Arc<Mutex<ProcessState>>,
    writer_tx: mpsc::UnboundedSender<Vec<u8>>,
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: SharedChild,
    size: Mutex<(u16, u16)>,
}

impl PtyHandle {
    pub(crate) fn new(
        pid: Option<u32>,
        state: Arc<Mutex<ProcessState>>,
        writer_tx: mpsc::UnboundedSender<Vec<u8>>,
        master: Box<dyn MasterPty + Send>,
        child: SharedChild,
        size: (u16, u16),
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pid,
            state,
            writer_tx,
            master: Mutex::new(master),
            child,
            size: Mutex::new(size),
        }
    }

    /// Handle identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// OS process id, when the platform reports one
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessState {
        *self.state.lock()
    }

    /// Check if the process accepts input
    pub fn is_running(&self) -> bool {
        self.state() == ProcessState::Running
    }

    /// Current geometry as (cols, rows)
    pub fn size(&self) -> (u16, u16) {
        *self.size.lock()
    }

    /// Queue bytes for the process. Writes reach the PTY in call order.
    pub fn write(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.ensure_running()?;
        self.writer_tx
            .send(data.into())
            .map_err(|_| PtyError::Write("input channel closed".to_string()))
    }

    /// Change the terminal geometry
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.ensure_running()?;
        if cols == 0 || rows == 0 {
            return Err(PtyError::InvalidSize { cols, rows });
        }

        self.master
            .lock()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Resize(e.to_string()))?;

        *self.size.lock() = (cols, rows);
        debug!(pid = ?self.pid, cols, rows, "PTY resized");
        Ok(())
    }

    /// Kill the process. A process that already exited is left alone.
    ///
    /// Sends SIGHUP first and SIGKILL if the child is still alive after a
    /// short grace period. Returns once the kill is confirmed.
    pub fn terminate(&self) -> Result<()> {
        if let ProcessState::Exited(_) = self.state() {
            return Ok(());
        }

        {
            // Held across the check and the kill so the waiter cannot reap
            // the pid in between.
            let mut child = self.child.lock();
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid = ?self.pid, code = status.exit_code(), "PTY process already exited");
                }
                _ => {
                    debug!(pid = ?self.pid, "Terminating PTY process");
                    child.kill().map_err(|e| {
                        warn!(pid = ?self.pid, error = %e, "Failed to kill PTY process");
                        PtyError::Terminate(e.to_string())
                    })?;
                }
            }
        }

        let mut state = self.state.lock();
        if !matches!(*state, ProcessState::Exited(_)) {
            *state = ProcessState::Exited(None);
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state() {
            ProcessState::Running => Ok(()),
            _ => Err(PtyError::NotRunning),
        }
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if let ProcessState::Exited(_) = self.state() {
            return;
        }
        if let Err(e) = self.terminate() {
            warn!(pid = ?self.pid, error = %e, "Failed to kill PTY process on drop");
        }
    }
}

impl std::fmt::Debug for PtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandle")
            .field("id", &self.id)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .field("size", &self.size())
            .finish()
    }
}
