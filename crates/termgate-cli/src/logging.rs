//! Tracing subscriber setup

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Level used when nothing else is configured
pub const DEFAULT_LEVEL: &str = "info";

/// Pick the filter directive: flag, then `RUST_LOG`, then the config file
pub fn directive(flag: Option<&str>, env: Option<&str>, configured: Option<&str>) -> String {
    [flag, env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_LEVEL)
        .to_string()
}

/// Install the global subscriber. Logs go to stderr; stdout is reserved for
/// the announcement the parent process reads.
pub fn init(flag: Option<&str>, configured: Option<&str>) -> anyhow::Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = directive(flag, env.as_deref(), configured);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("invalid log filter {directive:?}: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        assert_eq!(directive(Some("debug"), Some("warn"), Some("error")), "debug");
    }

    #[test]
    fn test_env_before_config() {
        assert_eq!(directive(None, Some("termgate_gateway=trace"), Some("error")), "termgate_gateway=trace");
        assert_eq!(directive(None, Some("  "), Some("error")), "error");
    }

    #[test]
    fn test_default_level() {
        assert_eq!(directive(None, None, None), DEFAULT_LEVEL);
    }
}
