//! Integration tests spawning real PTY processes

#![cfg(unix)]

use std::time::{Duration, Instant};

use termgate_pty::{ProcessState, PtyError, PtyEvent, PtyManager, SpawnConfig};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

fn sh(script: &str) -> SpawnConfig {
    SpawnConfig::new()
        .with_shell("/bin/sh")
        .with_args(["-c", script])
        .with_size(80, 24)
}

/// Collect output until the exit event, returning (output, exit code)
async fn drain(events: &mut UnboundedReceiver<PtyEvent>) -> (Vec<u8>, Option<i32>) {
    let mut output = Vec::new();
    loop {
        let event = timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for PTY event")
            .expect("event stream ended without exit");
        match event {
            PtyEvent::Output(chunk) => output.extend_from_slice(&chunk),
            PtyEvent::Exit(code) => return (output, code),
        }
    }
}

/// Read output until it contains `needle`
async fn wait_for_output(events: &mut UnboundedReceiver<PtyEvent>, needle: &str) {
    let mut output = Vec::new();
    while !String::from_utf8_lossy(&output).contains(needle) {
        match timeout(EVENT_TIMEOUT, events.recv()).await {
            Ok(Some(PtyEvent::Output(chunk))) => output.extend_from_slice(&chunk),
            other => panic!("expected {needle:?} before {other:?}"),
        }
    }
}

/// Wait for the exit event, returning how long it took
async fn time_to_exit(events: &mut UnboundedReceiver<PtyEvent>) -> Duration {
    let started = Instant::now();
    loop {
        match timeout(EVENT_TIMEOUT, events.recv()).await {
            Ok(Some(PtyEvent::Output(_))) => continue,
            Ok(Some(PtyEvent::Exit(_))) | Ok(None) => return started.elapsed(),
            Err(_) => panic!("process still running after {EVENT_TIMEOUT:?}"),
        }
    }
}

#[cfg(target_os = "linux")]
fn process_exists(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

/// Shell that ignores SIGHUP, then becomes a long sleep with the same pid
const HANGUP_IMMUNE: &str = "trap '' HUP; echo armed; exec sleep 30";

#[tokio::test]
async fn test_output_and_exit_status() {
    let (handle, mut events) = PtyManager::new().spawn(sh("echo $((40+2))")).unwrap();
    assert!(handle.pid().is_some());

    let (output, code) = drain(&mut events).await;
    assert!(String::from_utf8_lossy(&output).contains("42"));
    assert_eq!(code, Some(0));
    assert_eq!(handle.state(), ProcessState::Exited(Some(0)));
}

#[tokio::test]
async fn test_output_in_production_order() {
    let (_handle, mut events) = PtyManager::new()
        .spawn(sh("printf one; printf two; printf three"))
        .unwrap();

    let (output, _) = drain(&mut events).await;
    assert!(String::from_utf8_lossy(&output).contains("onetwothree"));
}

#[tokio::test]
async fn test_writes_applied_in_submission_order() {
    let (handle, mut events) = PtyManager::new().spawn(sh("read line; echo \"got:$line\"")).unwrap();

    handle.write(b"a".to_vec()).unwrap();
    handle.write(b"b".to_vec()).unwrap();
    handle.write(b"c\n".to_vec()).unwrap();

    let (output, code) = drain(&mut events).await;
    assert!(String::from_utf8_lossy(&output).contains("got:abc"));
    assert_eq!(code, Some(0));
}

#[tokio::test]
async fn test_nonzero_exit_then_not_running() {
    let (handle, mut events) = PtyManager::new().spawn(sh("exit 3")).unwrap();

    let (_, code) = drain(&mut events).await;
    assert_eq!(code, Some(3));

    assert!(matches!(handle.write(b"late".to_vec()), Err(PtyError::NotRunning)));
    assert!(matches!(handle.resize(100, 30), Err(PtyError::NotRunning)));
}

#[tokio::test]
async fn test_terminate_running_process() {
    let (handle, mut events) = PtyManager::new().spawn(sh("sleep 30")).unwrap();
    assert!(handle.is_running());

    handle.terminate().unwrap();
    assert!(matches!(handle.state(), ProcessState::Exited(_)));
    assert!(matches!(handle.write(b"x".to_vec()), Err(PtyError::NotRunning)));

    let (_, _) = drain(&mut events).await;
    // Terminating twice is a no-op
    handle.terminate().unwrap();
}

#[tokio::test]
async fn test_resize_running_process() {
    let (handle, mut events) = PtyManager::new().spawn(sh("sleep 2; stty size")).unwrap();

    handle.resize(132, 43).unwrap();
    assert_eq!(handle.size(), (132, 43));
    assert!(matches!(handle.resize(0, 43), Err(PtyError::InvalidSize { .. })));

    let (output, _) = drain(&mut events).await;
    assert!(String::from_utf8_lossy(&output).contains("43 132"));
}

#[tokio::test]
async fn test_drop_kills_process() {
    let (handle, mut events) = PtyManager::new().spawn(sh("sleep 30")).unwrap();
    drop(handle);

    let event = timeout(EVENT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Some(PtyEvent::Exit(code)) => return Some(code),
                Some(PtyEvent::Output(_)) => continue,
                None => return None,
            }
        }
    })
    .await
    .expect("process was not reaped after drop");
    assert!(event.is_some());
}

#[tokio::test]
async fn test_custom_env_reaches_process() {
    let config = sh("echo \"$TERMGATE_MARKER/$TERM\"").with_env("TERMGATE_MARKER", "marker-value");
    let (_handle, mut events) = PtyManager::new().spawn(config).unwrap();

    let (output, _) = drain(&mut events).await;
    assert!(String::from_utf8_lossy(&output).contains("marker-value/xterm-256color"));
}

#[tokio::test]
async fn test_terminate_kills_process_ignoring_hangup() {
    let (handle, mut events) = PtyManager::new().spawn(sh(HANGUP_IMMUNE)).unwrap();
    let pid = handle.pid().unwrap();
    wait_for_output(&mut events, "armed").await;

    handle.terminate().unwrap();
    assert!(!handle.is_running());

    let elapsed = time_to_exit(&mut events).await;
    assert!(elapsed < Duration::from_secs(5), "exit took {elapsed:?}");

    #[cfg(target_os = "linux")]
    {
        let reaped = timeout(Duration::from_secs(2), async {
            while process_exists(pid) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(reaped.is_ok(), "pid {pid} survived terminate");
    }
    #[cfg(not(target_os = "linux"))]
    let _ = pid;
}

#[tokio::test]
async fn test_drop_kills_process_ignoring_hangup() {
    let (handle, mut events) = PtyManager::new().spawn(sh(HANGUP_IMMUNE)).unwrap();
    wait_for_output(&mut events, "armed").await;

    drop(handle);
    let elapsed = time_to_exit(&mut events).await;
    assert!(elapsed < Duration::from_secs(5), "exit took {elapsed:?}");
}
