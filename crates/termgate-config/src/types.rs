//! Configuration types

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

use crate::error::Result;

/// Log levels accepted in `logging.level`
pub const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Socket gateway settings
    pub gateway: GatewaySettings,
    /// Terminal defaults
    pub pty: PtySettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Socket gateway settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewaySettings {
    /// Listen address; must be loopback
    pub bind: IpAddr,
    /// Listen port; 0 picks an ephemeral port
    pub port: u16,
}

/// Terminal defaults for new sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PtySettings {
    /// Shell to run when a session does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Initial columns
    pub cols: u16,
    /// Initial rows
    pub rows: u16,
    /// TERM value for spawned processes
    pub term: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level filter when neither a flag nor RUST_LOG is given
    pub level: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        }
    }
}

impl Default for PtySettings {
    fn default() -> Self {
        Self {
            shell: None,
            cols: 80,
            rows: 24,
            term: "xterm-256color".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration storage operations
pub trait ConfigStore {
    /// Load configuration from all sources
    fn load_config(&mut self) -> Result<AppConfig>;

    /// Persist configuration
    fn save_config(&self, config: &AppConfig) -> Result<()>;

    /// Check configuration values
    fn validate_config(&self, config: &AppConfig) -> Result<()>;
}
