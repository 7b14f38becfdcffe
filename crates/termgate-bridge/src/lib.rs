//! Gatekeeper bridge
//!
//! The [`GatekeeperBridge`] is the only conduit from the untrusted front end
//! to the privileged back end. Every `send`, `invoke`, `on` and `once` call
//! is checked against the [`CapabilityRegistry`] before anything crosses the
//! boundary; a rejected call is audited and surfaces only as a generic
//! [`BridgeError::CapabilityDenied`].
//!
//! The back end side is a [`Backend`]; [`ChannelBackend`] carries envelopes
//! over a tokio channel to a [`HandlerRouter`] running on the privileged side.

pub mod audit;
pub mod backend;
pub mod bridge;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod router;
pub mod subscription;

pub use audit::{AuditAction, AuditLog, AuditRecord, Operation};
pub use backend::{Backend, BackendRequest, ChannelBackend};
pub use bridge::GatekeeperBridge;
pub use envelope::Envelope;
pub use error::{BridgeError, Result};
pub use router::{handler_fn, FnHandler, Handler, HandlerRouter};
pub use subscription::Subscription;

pub use termgate_capabilities::{Capability, CapabilityRegistry};
