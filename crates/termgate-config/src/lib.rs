//! Termgate configuration
//!
//! Settings are layered from serde defaults, an optional TOML file and
//! `TERMGATE__*` environment variables (`TERMGATE__GATEWAY__PORT=9000`).

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::ConfigManager;
pub use types::{AppConfig, ConfigStore, GatewaySettings, LoggingSettings, PtySettings};
