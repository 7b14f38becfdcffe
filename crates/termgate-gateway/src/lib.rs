//! Terminal session gateway
//!
//! A WebSocket listener bound to loopback that admits one client at a time.
//! Each attempt is screened at accept time (peer address, single-connection
//! slot, Origin/Host policy), then given a fixed window to present the
//! session token. An authenticated connection becomes a [`Session`] that
//! binds to one PTY process and relays bytes both ways.
//!
//! ```no_run
//! use termgate_gateway::{Gateway, GatewayConfig};
//!
//! # async fn run() -> termgate_gateway::Result<()> {
//! let running = Gateway::new(GatewayConfig::default())?.start().await?;
//! println!("{} {}", running.url(), running.token().expose());
//! running.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod server;
pub mod session;
pub mod slot;
pub mod token;

pub use config::{GatewayConfig, AUTH_TIMEOUT, DEFAULT_TRUSTED_SCHEMES};
pub use error::{GatewayError, RejectReason, Result};
pub use policy::AccessPolicy;
pub use protocol::{close_code, ClientMessage, ErrorKind, ExecuteRequest, ServerMessage};
pub use server::{Gateway, GatewayStats, RunningGateway, StatsSnapshot};
pub use session::{Session, SessionDefaults};
pub use slot::{ConnectionInfo, ConnectionSlot, ConnectionState, SlotGuard};
pub use token::SessionToken;
