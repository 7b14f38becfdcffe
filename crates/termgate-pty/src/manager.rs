//! PTY spawning using portable-pty

use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, PtySize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    config::{interactive_env, SpawnConfig},
    error::{PtyError, Result},
    events::PtyEvent,
    handle::{ProcessState, PtyHandle, SharedChild},
};

/// How long output may keep arriving after the child exits. Grandchildren
/// can hold the PTY open; the exit event is not held back longer than this.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How often the waiter thread checks whether the child has exited
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

const READ_BUFFER_SIZE: usize = 4096;

/// Messages from the blocking I/O threads to the event pump
enum PumpInput {
    Output(Vec<u8>),
    ReaderDone,
    ChildExited(Option<i32>),
}

/// Spawns PTY processes
#[derive(Debug, Default, Clone, Copy)]
pub struct PtyManager;

impl PtyManager {
    /// Create new PTY manager
    pub fn new() -> Self {
        Self
    }

    /// Spawn a process on a fresh pseudo-terminal
    ///
    /// Returns the handle and the event receiver. Output events arrive in
    /// production order; [`PtyEvent::Exit`] is always last.
    ///
    /// # Examples
    /// ```no_run
    /// use termgate_pty::{PtyManager, SpawnConfig};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = SpawnConfig::new().with_shell("/bin/sh").with_size(80, 24);
    /// let (handle, _events) = PtyManager::new().spawn(config)?;
    /// handle.write(b"echo hi\n".to_vec())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(&self, config: SpawnConfig) -> Result<(PtyHandle, mpsc::UnboundedReceiver<PtyEvent>)> {
        config.validate()?;

        debug!(
            shell = %config.shell,
            args = ?config.args,
            cols = config.cols,
            rows = config.rows,
            "Spawning PTY process"
        );

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.rows,
                cols: config.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Spawn(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&config.shell);
        cmd.args(&config.args);
        if let Some(cwd) = config.cwd.clone().or_else(|| std::env::current_dir().ok()) {
            cmd.cwd(cwd);
        }
        for (key, value) in interactive_env().iter().chain(config.env.iter()) {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(e.to_string()))?;
        // The child owns its copy; ours would keep the reader from seeing EOF.
        drop(pair.slave);

        let pid = child.process_id();
        let child: SharedChild = Arc::new(Mutex::new(child));

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| abandon(&child, pid, format!("failed to clone PTY reader: {e}")))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| abandon(&child, pid, format!("failed to take PTY writer: {e}")))?;

        let state = Arc::new(Mutex::new(ProcessState::Spawned));

        let (writer_tx, writer_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<PtyEvent>();
        let (pump_tx, pump_rx) = std_mpsc::channel::<PumpInput>();

        let reader_tx = pump_tx.clone();
        spawn_io_thread("pty-reader", &child, pid, move || {
            read_pty_output(reader, reader_tx)
        })?;
        spawn_io_thread("pty-writer", &child, pid, move || {
            write_to_pty(writer, writer_rx, pid)
        })?;

        let waiter_state = Arc::clone(&state);
        let waiter_child = Arc::clone(&child);
        spawn_io_thread("pty-waiter", &child, pid, move || {
            let code = wait_for_exit(&waiter_child, pid);
            {
                let mut state = waiter_state.lock();
                if !matches!(*state, ProcessState::Exited(_)) {
                    *state = ProcessState::Exited(code);
                }
            }
            debug!(pid = ?pid, code = ?code, "PTY child exited");
            let _ = pump_tx.send(PumpInput::ChildExited(code));
        })?;

        spawn_io_thread("pty-pump", &child, pid, move || pump_events(pump_rx, event_tx))?;

        {
            let mut current = state.lock();
            if *current == ProcessState::Spawned {
                *current = ProcessState::Running;
            }
        }

        info!(pid = ?pid, shell = %config.shell, "PTY process spawned");

        let handle = PtyHandle::new(
            pid,
            state,
            writer_tx,
            pair.master,
            child,
            (config.cols, config.rows),
        );
        Ok((handle, event_rx))
    }
}

/// Start one of the blocking I/O threads
fn spawn_io_thread<F>(name: &str, child: &SharedChild, pid: Option<u32>, f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map(|_| ())
        .map_err(|e| abandon(child, pid, format!("failed to start {name} thread: {e}")))
}

/// Kill a child whose setup failed part way, so it does not outlive the error
fn abandon(child: &SharedChild, pid: Option<u32>, message: String) -> PtyError {
    error!(pid = ?pid, error = %message, "PTY setup failed after spawn");
    if let Err(e) = child.lock().kill() {
        warn!(pid = ?pid, error = %e, "Failed to kill abandoned PTY child");
    }
    PtyError::Spawn(message)
}

/// Poll the child until it exits. The lock is only held for each check so
/// `PtyHandle::terminate` can kill in between.
fn wait_for_exit(child: &SharedChild, pid: Option<u32>) -> Option<i32> {
    loop {
        match child.lock().try_wait() {
            Ok(Some(status)) => return Some(status.exit_code() as i32),
            Ok(None) => {}
            Err(e) => {
                error!(pid = ?pid, error = %e, "Failed to wait for PTY child");
                return None;
            }
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

/// Read from PTY in a loop, forwarding chunks to the pump
fn read_pty_output(mut reader: Box<dyn Read + Send>, tx: std_mpsc::Sender<PumpInput>) {
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("PTY reader got EOF");
                break;
            }
            Ok(n) => {
                if tx.send(PumpInput::Output(buf[..n].to_vec())).is_err() {
                    debug!("PTY pump closed");
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO is how Linux reports a hung-up PTY once the child is gone.
                debug!(error = %e, "PTY reader stopped");
                break;
            }
        }
    }
    let _ = tx.send(PumpInput::ReaderDone);
}

/// Drain queued input into the PTY, in submission order
fn write_to_pty(
    mut writer: Box<dyn Write + Send>,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pid: Option<u32>,
) {
    while let Some(data) = rx.blocking_recv() {
        let written = writer.write_all(&data).and_then(|()| writer.flush());
        if let Err(e) = written {
            error!(pid = ?pid, bytes = data.len(), error = %e, "Dropping PTY input after failed write");
            return;
        }
    }
    debug!(pid = ?pid, "PTY input closed");
}

/// Forward output in order and emit the exit event last.
///
/// Once the child has exited, output keeps flowing until the reader hits EOF
/// or [`EXIT_DRAIN_GRACE`] elapses, whichever comes first.
fn pump_events(rx: std_mpsc::Receiver<PumpInput>, tx: mpsc::UnboundedSender<PtyEvent>) {
    let mut reader_done = false;
    let mut exit: Option<(Option<i32>, Instant)> = None;

    loop {
        if let Some((code, _)) = exit {
            if reader_done {
                let _ = tx.send(PtyEvent::Exit(code));
                return;
            }
        }

        let input = match exit {
            Some((code, deadline)) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(input) => input,
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {
                        debug!("PTY output still open after exit; closing stream");
                        let _ = tx.send(PtyEvent::Exit(code));
                        return;
                    }
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                        let _ = tx.send(PtyEvent::Exit(code));
                        return;
                    }
                }
            }
            None => match rx.recv() {
                Ok(input) => input,
                Err(_) => {
                    let _ = tx.send(PtyEvent::Exit(None));
                    return;
                }
            },
        };

        match input {
            PumpInput::Output(chunk) => {
                if tx.send(PtyEvent::Output(chunk)).is_err() {
                    debug!("PTY event receiver dropped");
                }
            }
            PumpInput::ReaderDone => reader_done = true,
            PumpInput::ChildExited(code) => {
                exit = Some((code, Instant::now() + EXIT_DRAIN_GRACE));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_pump(inputs: Vec<PumpInput>) -> Vec<PtyEvent> {
        let (pump_tx, pump_rx) = std_mpsc::channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        for input in inputs {
            pump_tx.send(input).unwrap();
        }
        drop(pump_tx);

        pump_events(pump_rx, event_tx);

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_pump_orders_exit_after_output() {
        let events = run_pump(vec![
            PumpInput::Output(b"one".to_vec()),
            PumpInput::ChildExited(Some(0)),
            PumpInput::Output(b"two".to_vec()),
            PumpInput::ReaderDone,
        ]);

        assert_eq!(
            events,
            vec![
                PtyEvent::Output(b"one".to_vec()),
                PtyEvent::Output(b"two".to_vec()),
                PtyEvent::Exit(Some(0)),
            ]
        );
    }

    #[test]
    fn test_pump_reader_done_first() {
        let events = run_pump(vec![
            PumpInput::Output(b"x".to_vec()),
            PumpInput::ReaderDone,
            PumpInput::ChildExited(Some(7)),
        ]);

        assert_eq!(events, vec![PtyEvent::Output(b"x".to_vec()), PtyEvent::Exit(Some(7))]);
    }

    #[test]
    fn test_pump_grace_expires() {
        let (pump_tx, pump_rx) = std_mpsc::channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        pump_tx.send(PumpInput::ChildExited(Some(1))).unwrap();

        let started = Instant::now();
        // Sender kept alive: the reader never finishes.
        pump_events(pump_rx, event_tx);
        assert!(started.elapsed() >= EXIT_DRAIN_GRACE);
        drop(pump_tx);

        assert_eq!(event_rx.try_recv().unwrap(), PtyEvent::Exit(Some(1)));
        assert!(event_rx.try_recv().is_err());
    }

    #[test]
    fn test_pump_emits_exit_when_inputs_vanish() {
        let events = run_pump(vec![PumpInput::Output(b"partial".to_vec())]);
        assert_eq!(
            events,
            vec![PtyEvent::Output(b"partial".to_vec()), PtyEvent::Exit(None)]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_abandon_kills_half_started_child() {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .unwrap();
        let mut cmd = CommandBuilder::new("/bin/sh");
        cmd.args(["-c", "trap '' HUP; exec sleep 30"]);
        let child = pair.slave.spawn_command(cmd).unwrap();
        let pid = child.process_id();
        let child: SharedChild = Arc::new(Mutex::new(child));
        // Give the shell time to install the trap before it is signalled.
        thread::sleep(Duration::from_millis(200));

        let err = abandon(&child, pid, "failed to start pty-reader thread".to_string());
        assert!(matches!(err, PtyError::Spawn(ref message) if message.contains("pty-reader")));

        let started = Instant::now();
        while child.lock().try_wait().unwrap().is_none() {
            assert!(started.elapsed() < Duration::from_secs(5), "abandoned child still running");
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    #[test]
    fn test_spawn_rejects_zero_size() {
        let result = PtyManager::new().spawn(SpawnConfig::new().with_size(0, 0));
        assert!(matches!(result, Err(PtyError::InvalidSize { .. })));
    }
}
