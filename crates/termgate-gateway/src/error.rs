//! Gateway error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use termgate_pty::PtyError;
use thiserror::Error;

use crate::protocol::{close_code, ErrorKind};

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Why an attempt was turned away before the upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another connection holds the slot
    Busy,
    /// Origin header not on the allowlist
    Origin,
    /// No Origin, and Host is missing or not loopback
    Host,
    /// Peer address is not loopback
    Peer,
}

impl RejectReason {
    /// HTTP status returned for this rejection
    pub fn status(self) -> StatusCode {
        match self {
            RejectReason::Busy => StatusCode::CONFLICT,
            RejectReason::Origin | RejectReason::Host | RejectReason::Peer => StatusCode::FORBIDDEN,
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::Busy => "session already active",
            RejectReason::Origin => "origin not allowed",
            RejectReason::Host => "host not allowed",
            RejectReason::Peer => "peer not allowed",
        };
        f.write_str(reason)
    }
}

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Connection rejected: {0}")]
    ConnectionRejected(RejectReason),

    #[error("Authentication timed out")]
    AuthenticationTimeout,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Malformed handshake: {0}")]
    MalformedHandshake(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(#[source] PtyError),

    #[error("Failed to write to process: {0}")]
    ProcessWrite(#[source] PtyError),

    #[error("Failed to resize terminal: {0}")]
    ProcessResize(#[source] PtyError),

    #[error("Invalid session state: {0}")]
    SessionState(String),

    #[error("Client disconnected")]
    ClientClosed,

    #[error("Gateway shutting down")]
    Shutdown,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// WebSocket close code for errors that end a connection
    pub fn close_code(&self) -> u16 {
        match self {
            GatewayError::AuthenticationTimeout => close_code::AUTH_TIMEOUT,
            GatewayError::InvalidCredential => close_code::INVALID_CREDENTIAL,
            GatewayError::MalformedHandshake(_) => close_code::MALFORMED_HANDSHAKE,
            GatewayError::ProtocolViolation(_) => close_code::PROTOCOL_VIOLATION,
            GatewayError::ClientClosed => close_code::NORMAL,
            GatewayError::Shutdown => close_code::GOING_AWAY,
            _ => close_code::INTERNAL_ERROR,
        }
    }

    /// Close reason sent alongside [`close_code`](Self::close_code). Never
    /// echoes client input.
    pub fn close_reason(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationTimeout => "authentication timeout",
            GatewayError::InvalidCredential => "invalid credential",
            GatewayError::MalformedHandshake(_) => "malformed handshake",
            GatewayError::ProtocolViolation(_) => "protocol violation",
            GatewayError::ClientClosed => "client closed",
            GatewayError::Shutdown => "gateway shutting down",
            _ => "internal error",
        }
    }

    /// Operational failures reported in-band; the connection stays open
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            GatewayError::ProcessSpawn(_) => Some(ErrorKind::Spawn),
            GatewayError::ProcessWrite(_) => Some(ErrorKind::Write),
            GatewayError::ProcessResize(_) => Some(ErrorKind::Resize),
            GatewayError::SessionState(_) => Some(ErrorKind::State),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            GatewayError::ConnectionRejected(reason) => (reason.status(), "connection_rejected"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
