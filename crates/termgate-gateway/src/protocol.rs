//! Wire protocol for the terminal socket

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use termgate_capabilities::Capability;
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::token::SessionToken;

/// WebSocket close codes used by the gateway
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_VIOLATION: u16 = 1002;
    pub const INTERNAL_ERROR: u16 = 1011;
    pub const MALFORMED_HANDSHAKE: u16 = 4400;
    pub const INVALID_CREDENTIAL: u16 = 4401;
    pub const AUTH_TIMEOUT: u16 = 4408;
}

/// First message on a new connection
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthRequest {
    pub token: String,
}

/// Process start parameters; anything omitted uses the gateway defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
}

/// Control messages from an active client (text frames)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "terminal:execute")]
    Execute(ExecuteRequest),
    #[serde(rename = "terminal:write")]
    Write { data: String },
    #[serde(rename = "terminal:resize")]
    Resize { cols: u16, rows: u16 },
    #[serde(rename = "terminal:kill")]
    Kill,
}

impl ClientMessage {
    /// Capability this message exercises
    pub fn capability(&self) -> Capability {
        match self {
            ClientMessage::Execute(_) => Capability::TerminalExecute,
            ClientMessage::Write { .. } => Capability::TerminalWrite,
            ClientMessage::Resize { .. } => Capability::TerminalResize,
            ClientMessage::Kill => Capability::TerminalKill,
        }
    }
}

/// Category of an in-band operational error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Spawn,
    Write,
    Resize,
    State,
}

/// Messages to the client (text frames). PTY output travels as binary frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "ready")]
    Ready {
        session_id: Uuid,
        cols: u16,
        rows: u16,
        version: String,
    },
    #[serde(rename = "spawned")]
    Spawned { pid: Option<u32>, cols: u16, rows: u16 },
    #[serde(rename = "terminal:exit")]
    Exit { code: Option<i32> },
    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

/// Check the handshake payload against the session token
pub fn verify_handshake(payload: &str, token: &SessionToken) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| GatewayError::MalformedHandshake(e.to_string()))?;
    if !value.is_object() {
        return Err(GatewayError::MalformedHandshake(
            "handshake must be a JSON object".to_string(),
        ));
    }
    let request: AuthRequest = serde_json::from_value(value)
        .map_err(|e| GatewayError::MalformedHandshake(e.to_string()))?;

    if token.verify(&request.token) {
        Ok(())
    } else {
        Err(GatewayError::InvalidCredential)
    }
}

/// Parse a control message from an active client
pub fn parse_client_message(text: &str) -> Result<ClientMessage> {
    serde_json::from_str(text).map_err(|e| GatewayError::ProtocolViolation(e.to_string()))
}
