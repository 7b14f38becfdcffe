//! Termgate PTY - pseudo-terminal processes for terminal sessions
//!
//! [`PtyManager::spawn`] starts a process on a fresh pseudo-terminal and
//! returns a [`PtyHandle`] for input, resizing and termination, together with
//! a receiver of [`PtyEvent`]s. Output chunks arrive in production order and
//! the stream always ends with a single [`PtyEvent::Exit`].

pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod manager;

pub use config::{default_shell, interactive_env, SpawnConfig};
pub use error::{PtyError, Result};
pub use events::PtyEvent;
pub use handle::{ProcessState, PtyHandle};
pub use manager::PtyManager;
