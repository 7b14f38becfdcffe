//! Argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use termgate_capabilities::Domain;

#[derive(Debug, Parser)]
#[command(name = "termgate")]
#[command(about = "Loopback terminal gateway for an untrusted front end")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG and the config file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the gateway and print its URL and token as JSON
    Serve {
        /// Listen port (0 picks an ephemeral port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List the capabilities that may cross the bridge
    Capabilities {
        /// Only show one domain (session, file, system, socket)
        #[arg(short, long)]
        domain: Option<Domain>,
    },
    /// Print the effective configuration as TOML
    Config,
}
