use clap::Parser;
use termgate_cli::{commands, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run(cli).await
}
