//! Command-line front for the termgate gateway
//!
//! The binary is normally launched by the privileged front-end shell, which
//! reads the single JSON announcement `serve` prints on stdout to learn the
//! gateway URL and session token.

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Cli, Commands};
