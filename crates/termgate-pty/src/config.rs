//! Spawn configuration for PTY processes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{PtyError, Result};

/// Default terminal width
pub const DEFAULT_COLS: u16 = 80;
/// Default terminal height
pub const DEFAULT_ROWS: u16 = 24;

/// What to run on a new PTY and at which size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Program to execute
    pub shell: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Working directory (default: current)
    pub cwd: Option<PathBuf>,
    /// Environment overrides, applied after [`interactive_env`]
    pub env: HashMap<String, String>,
    /// Terminal width in columns
    pub cols: u16,
    /// Terminal height in rows
    pub rows: u16,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl SpawnConfig {
    /// Create a config for the user's default shell
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the program to run
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set program arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add one environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set terminal geometry
    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Check the config before any OS resources are allocated
    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 || self.rows == 0 {
            return Err(PtyError::InvalidSize {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if self.shell.trim().is_empty() {
            return Err(PtyError::InvalidConfig("shell must not be empty".to_string()));
        }
        if let Some(cwd) = &self.cwd {
            if !cwd.is_dir() {
                return Err(PtyError::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    cwd.display()
                )));
            }
        }
        Ok(())
    }
}

/// The user's login shell, falling back to a platform default
pub fn default_shell() -> String {
    if cfg!(windows) {
        return "powershell.exe".to_string();
    }
    std::env::var("SHELL")
        .ok()
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}

/// Environment for interactive user terminals (TUI apps, colour output)
pub fn interactive_env() -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("TERM".to_string(), "xterm-256color".to_string());
    env.insert("COLORTERM".to_string(), "truecolor".to_string());
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpawnConfig::new();
        assert_eq!(config.cols, 80);
        assert_eq!(config.rows, 24);
        assert!(!config.shell.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = SpawnConfig::new().with_size(0, 24).validate().unwrap_err();
        assert!(matches!(err, PtyError::InvalidSize { cols: 0, rows: 24 }));

        let err = SpawnConfig::new().with_size(80, 0).validate().unwrap_err();
        assert!(matches!(err, PtyError::InvalidSize { cols: 80, rows: 0 }));
    }

    #[test]
    fn test_missing_cwd_rejected() {
        let config = SpawnConfig::new().with_cwd("/definitely/not/a/real/dir");
        assert!(matches!(config.validate(), Err(PtyError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_shell_rejected() {
        let config = SpawnConfig::new().with_shell("  ");
        assert!(matches!(config.validate(), Err(PtyError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder() {
        let config = SpawnConfig::new()
            .with_shell("/bin/sh")
            .with_args(["-c", "true"])
            .with_env("FOO", "bar")
            .with_size(120, 40);

        assert_eq!(config.shell, "/bin/sh");
        assert_eq!(config.args, vec!["-c".to_string(), "true".to_string()]);
        assert_eq!(config.env.get("FOO").map(String::as_str), Some("bar"));
        assert_eq!((config.cols, config.rows), (120, 40));
    }

    #[test]
    fn test_interactive_env() {
        let env = interactive_env();
        assert_eq!(env.get("TERM").map(String::as_str), Some("xterm-256color"));
        assert_eq!(env.get("COLORTERM").map(String::as_str), Some("truecolor"));
    }
}
