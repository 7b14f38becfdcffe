//! `termgate config`

use termgate_config::AppConfig;

pub fn render(config: &AppConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}
