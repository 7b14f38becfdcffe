//! Gateway configuration

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Window for the first message to carry a valid token. Not configurable.
pub const AUTH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Origin prefixes used by the privileged front-end shell
pub const DEFAULT_TRUSTED_SCHEMES: &[&str] = &["file://", "app://"];

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Listen address; loopback only
    pub bind: IpAddr,
    /// Listen port; 0 picks an ephemeral port
    pub port: u16,
    /// Origin prefixes accepted besides loopback HTTP(S)
    pub trusted_schemes: Vec<String>,
    /// Columns for a session that does not ask for a size
    pub default_cols: u16,
    /// Rows for a session that does not ask for a size
    pub default_rows: u16,
    /// Shell for a session that does not name one
    pub default_shell: Option<String>,
    /// TERM for spawned processes
    pub term: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            trusted_schemes: DEFAULT_TRUSTED_SCHEMES.iter().map(|s| s.to_string()).collect(),
            default_cols: 80,
            default_rows: 24,
            default_shell: None,
            term: "xterm-256color".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Set the listen port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the listen address
    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Set the default shell
    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = Some(shell.into());
        self
    }

    /// Reject anything that would expose the listener beyond loopback
    pub fn validate(&self) -> Result<()> {
        if !self.bind.is_loopback() {
            return Err(GatewayError::Config(format!(
                "bind address {} is not loopback",
                self.bind
            )));
        }
        if self.default_cols == 0 || self.default_rows == 0 {
            return Err(GatewayError::Config(
                "default terminal size must be non-zero".to_string(),
            ));
        }
        if self.trusted_schemes.iter().any(|s| s.is_empty()) {
            return Err(GatewayError::Config(
                "trusted scheme prefixes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
