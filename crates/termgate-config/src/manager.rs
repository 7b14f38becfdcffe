//! Configuration manager implementation

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::{AppConfig, ConfigStore, LOG_LEVELS},
};

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "TERMGATE";

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Create with custom config path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Override the environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Configuration file in use
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("termgate")
            .join("config.toml")
    }
}

impl ConfigStore for ConfigManager {
    fn load_config(&mut self) -> Result<AppConfig> {
        debug!(path = %self.config_path.display(), prefix = %self.env_prefix, "Loading configuration");

        let builder = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;
        self.validate_config(&app_config)?;
        Ok(app_config)
    }

    fn save_config(&self, config: &AppConfig) -> Result<()> {
        self.validate_config(config)?;
        let toml = toml::to_string_pretty(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml)?;
        debug!(path = %self.config_path.display(), "Configuration saved");
        Ok(())
    }

    fn validate_config(&self, config: &AppConfig) -> Result<()> {
        if !config.gateway.bind.is_loopback() {
            return Err(ConfigError::Validation(format!(
                "gateway.bind must be a loopback address, got {}",
                config.gateway.bind
            )));
        }
        if config.pty.cols == 0 || config.pty.rows == 0 {
            return Err(ConfigError::Validation(
                "pty.cols and pty.rows must be greater than 0".to_string(),
            ));
        }
        if config.pty.term.trim().is_empty() {
            return Err(ConfigError::Validation("pty.term must not be empty".to_string()));
        }
        if let Some(shell) = &config.pty.shell {
            if shell.trim().is_empty() {
                return Err(ConfigError::Validation("pty.shell must not be empty".to_string()));
            }
        }
        if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                config.logging.level
            )));
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    fn manager() -> ConfigManager {
        ConfigManager::with_path("/nonexistent/termgate.toml").with_env_prefix("TERMGATE_UNIT_NONE")
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(manager().validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = manager().load_config().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_wildcard_bind_rejected() {
        let mut config = AppConfig::default();
        config.gateway.bind = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        assert!(matches!(
            manager().validate_config(&config),
            Err(ConfigError::Validation(_))
        ));

        config.gateway.bind = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10));
        assert!(manager().validate_config(&config).is_err());

        config.gateway.bind = IpAddr::V6(Ipv6Addr::LOCALHOST);
        assert!(manager().validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_geometry_rejected() {
        let mut config = AppConfig::default();
        config.pty.rows = 0;
        assert!(manager().validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(manager().validate_config(&config).is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(manager().validate_config(&config).is_ok());
    }

    #[test]
    fn test_default_path_ends_with_termgate() {
        let path = ConfigManager::default_config_path();
        assert!(path.ends_with("termgate/config.toml"));
    }
}
