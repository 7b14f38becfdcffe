//! Authenticated terminal session bound to one PTY process

use termgate_pty::{default_shell, PtyEvent, PtyHandle, PtyManager, SpawnConfig};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::protocol::ExecuteRequest;

/// Values a session falls back on when the client does not choose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub shell: Option<String>,
    pub cols: u16,
    pub rows: u16,
    pub term: String,
}

impl From<&GatewayConfig> for SessionDefaults {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            shell: config.default_shell.clone(),
            cols: config.default_cols,
            rows: config.default_rows,
            term: config.term.clone(),
        }
    }
}

/// One authenticated session.
///
/// Created with the default geometry; binds its process on the first
/// `terminal:execute` and never binds another. Dropping the session kills a
/// process that is still running.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    defaults: SessionDefaults,
    geometry: (u16, u16),
    manager: PtyManager,
    process: Option<PtyHandle>,
    events: Option<mpsc::UnboundedReceiver<PtyEvent>>,
}

impl Session {
    /// Create a session with no process yet
    pub fn new(defaults: SessionDefaults) -> Self {
        let geometry = (defaults.cols, defaults.rows);
        Self {
            id: Uuid::new_v4(),
            defaults,
            geometry,
            manager: PtyManager::new(),
            process: None,
            events: None,
        }
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Negotiated geometry as (cols, rows)
    pub fn geometry(&self) -> (u16, u16) {
        self.geometry
    }

    /// The bound process, if one was started
    pub fn process(&self) -> Option<&PtyHandle> {
        self.process.as_ref()
    }

    /// Start the session's process. Returns (pid, cols, rows).
    pub fn execute(&mut self, request: ExecuteRequest) -> Result<(Option<u32>, u16, u16)> {
        if self.process.is_some() {
            return Err(GatewayError::SessionState(
                "session already has a process".to_string(),
            ));
        }

        let cols = request.cols.unwrap_or(self.geometry.0);
        let rows = request.rows.unwrap_or(self.geometry.1);
        let shell = request
            .shell
            .or_else(|| self.defaults.shell.clone())
            .unwrap_or_else(default_shell);

        let mut config = SpawnConfig::new()
            .with_shell(shell)
            .with_args(request.args)
            .with_size(cols, rows)
            .with_env("TERM", self.defaults.term.clone());
        if let Some(cwd) = request.cwd {
            config = config.with_cwd(cwd);
        }
        config.env.extend(request.env);

        let (handle, events) = self.manager.spawn(config).map_err(GatewayError::ProcessSpawn)?;
        let pid = handle.pid();
        info!(session_id = %self.id, pid = ?pid, cols, rows, "Session process started");

        self.geometry = (cols, rows);
        self.process = Some(handle);
        self.events = Some(events);
        Ok((pid, cols, rows))
    }

    /// Send input bytes to the process
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let process = self.require_process()?;
        process.write(data.to_vec()).map_err(GatewayError::ProcessWrite)
    }

    /// Change geometry. Before a process exists this only updates the size
    /// the process will start with.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        match &self.process {
            Some(process) => process
                .resize(cols, rows)
                .map_err(GatewayError::ProcessResize)?,
            None if cols == 0 || rows == 0 => {
                return Err(GatewayError::ProcessResize(
                    termgate_pty::PtyError::InvalidSize { cols, rows },
                ))
            }
            None => {}
        }
        self.geometry = (cols, rows);
        debug!(session_id = %self.id, cols, rows, "Session resized");
        Ok(())
    }

    /// Kill the bound process, if any
    pub fn terminate(&mut self) -> Result<()> {
        if let Some(process) = &self.process {
            process.terminate().map_err(|e| GatewayError::SessionState(e.to_string()))?;
        }
        Ok(())
    }

    /// Next event from the bound process. Pends forever while no process is
    /// bound; `None` once the event stream is exhausted.
    pub async fn next_event(&mut self) -> Option<PtyEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    fn require_process(&self) -> Result<&PtyHandle> {
        self.process
            .as_ref()
            .ok_or_else(|| GatewayError::SessionState("no process started".to_string()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            debug!(session_id = %self.id, pid = ?process.pid(), "Session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use std::time::Duration;

    fn defaults() -> SessionDefaults {
        SessionDefaults {
            shell: Some("/bin/sh".to_string()),
            cols: 80,
            rows: 24,
            term: "xterm-256color".to_string(),
        }
    }

    #[test]
    fn test_write_before_execute() {
        let session = Session::new(defaults());
        let err = session.write(b"ls\n").unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::State));
    }

    #[test]
    fn test_resize_before_execute_sets_geometry() {
        let mut session = Session::new(defaults());
        session.resize(132, 43).unwrap();
        assert_eq!(session.geometry(), (132, 43));

        let err = session.resize(0, 43).unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::Resize));
        assert_eq!(session.geometry(), (132, 43));
    }

    #[test]
    fn test_spawn_failure_is_operational() {
        let mut session = Session::new(defaults());
        let err = session
            .execute(ExecuteRequest {
                cwd: Some("/definitely/not/here".into()),
                ..ExecuteRequest::default()
            })
            .unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::Spawn));
        assert!(session.process().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_single_process_per_session() {
        let mut session = Session::new(defaults());
        let (pid, cols, rows) = session
            .execute(ExecuteRequest {
                args: vec!["-c".into(), "sleep 5".into()],
                ..ExecuteRequest::default()
            })
            .unwrap();
        assert!(pid.is_some());
        assert_eq!((cols, rows), (80, 24));

        let err = session.execute(ExecuteRequest::default()).unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::State));

        session.terminate().unwrap();
        let exited = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = session.next_event().await {
                if let PtyEvent::Exit(_) = event {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(exited);
    }

    #[tokio::test]
    async fn test_next_event_pends_without_process() {
        let mut session = Session::new(defaults());
        let result = tokio::time::timeout(Duration::from_millis(50), session.next_event()).await;
        assert!(result.is_err());
    }
}
