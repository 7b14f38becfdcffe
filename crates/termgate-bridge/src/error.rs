//! Error types for the gatekeeper bridge

use termgate_capabilities::Capability;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The capability is not registered. Never names the capability.
    #[error("Operation not permitted")]
    CapabilityDenied,

    /// A back-end handler failed
    #[error("Back-end error: {0}")]
    Backend(String),

    /// Allowed capability with no back-end handler
    #[error("No handler registered for {0}")]
    NoHandler(Capability),

    /// The back end is gone
    #[error("Back end disconnected")]
    Disconnected,

    /// The request was dropped without a reply
    #[error("Back end dropped the request without replying")]
    NoReply,
}
