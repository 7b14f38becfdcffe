//! Error types for the capability registry

use thiserror::Error;

/// Result type for capability operations
pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Errors that can occur when resolving capabilities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Rejection surfaced across the trust boundary. Deliberately carries no
    /// name so callers cannot tell "unknown" apart from "not registered".
    #[error("Operation not permitted")]
    Denied,

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Unknown capability domain: {0}")]
    UnknownDomain(String),
}
