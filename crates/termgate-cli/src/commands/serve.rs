//! `termgate serve`

use anyhow::Context;
use serde_json::json;
use termgate_config::AppConfig;
use termgate_gateway::{Gateway, GatewayConfig};
use tracing::info;

/// Map file settings onto the gateway; `port` overrides the file
pub fn gateway_config(config: &AppConfig, port: Option<u16>) -> GatewayConfig {
    GatewayConfig {
        bind: config.gateway.bind,
        port: port.unwrap_or(config.gateway.port),
        default_cols: config.pty.cols,
        default_rows: config.pty.rows,
        default_shell: config.pty.shell.clone(),
        term: config.pty.term.clone(),
        ..GatewayConfig::default()
    }
}

/// Run until Ctrl-C
pub async fn run(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let gateway = Gateway::new(gateway_config(config, port)).context("invalid gateway settings")?;
    let running = gateway.start().await.context("failed to start gateway")?;

    // The parent process reads exactly this line.
    println!(
        "{}",
        json!({ "url": running.url(), "token": running.token().expose() })
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Interrupted, shutting down");
    running.stop().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv6Addr};
    use termgate_gateway::DEFAULT_TRUSTED_SCHEMES;

    #[test]
    fn test_settings_carried_over() {
        let mut config = AppConfig::default();
        config.gateway.bind = IpAddr::V6(Ipv6Addr::LOCALHOST);
        config.gateway.port = 9000;
        config.pty.shell = Some("/bin/zsh".to_string());
        config.pty.cols = 132;

        let gateway = gateway_config(&config, None);
        assert_eq!(gateway.bind, config.gateway.bind);
        assert_eq!(gateway.port, 9000);
        assert_eq!(gateway.default_cols, 132);
        assert_eq!(gateway.default_shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(gateway.trusted_schemes, DEFAULT_TRUSTED_SCHEMES);
    }

    #[test]
    fn test_port_flag_overrides_file() {
        let mut config = AppConfig::default();
        config.gateway.port = 9000;
        assert_eq!(gateway_config(&config, Some(0)).port, 0);
    }
}
