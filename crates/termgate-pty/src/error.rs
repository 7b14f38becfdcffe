//! Error types for PTY process management

use thiserror::Error;

/// PTY process errors
#[derive(Debug, Error)]
pub enum PtyError {
    /// Failed to open the PTY or start the process
    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    /// Input could not be delivered to the process
    #[error("Failed to write to process: {0}")]
    Write(String),

    /// Failed to change the terminal size
    #[error("Failed to resize terminal: {0}")]
    Resize(String),

    /// Failed to kill the process
    #[error("Failed to terminate process: {0}")]
    Terminate(String),

    /// Operation requires a running process
    #[error("Process not running")]
    NotRunning,

    /// Terminal geometry must be non-zero
    #[error("Invalid terminal size {cols}x{rows}")]
    InvalidSize { cols: u16, rows: u16 },

    /// Invalid spawn configuration
    #[error("Invalid spawn configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for PTY operations
pub type Result<T> = std::result::Result<T, PtyError>;
