//! Cross-boundary conduit to the privileged back end

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};

/// The privileged side of the bridge.
///
/// Implementations only ever receive envelopes whose capability has already
/// been admitted by the registry.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fire-and-forget notification
    fn notify(&self, envelope: Envelope) -> Result<()>;

    /// Request that resolves with exactly one reply
    async fn request(&self, envelope: Envelope) -> Result<Value>;
}

/// What the privileged side receives from a [`ChannelBackend`]
#[derive(Debug)]
pub enum BackendRequest {
    /// From `send`; no reply expected
    Notify(Envelope),
    /// From `invoke`; answer on `reply`
    Invoke {
        envelope: Envelope,
        reply: oneshot::Sender<Result<Value>>,
    },
}

impl BackendRequest {
    /// The envelope carried by this request
    pub fn envelope(&self) -> &Envelope {
        match self {
            BackendRequest::Notify(envelope) => envelope,
            BackendRequest::Invoke { envelope, .. } => envelope,
        }
    }
}

/// Backend that forwards envelopes over an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelBackend {
    tx: mpsc::UnboundedSender<BackendRequest>,
}

impl ChannelBackend {
    /// Create a backend and the receiver the privileged side drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BackendRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Backend for ChannelBackend {
    fn notify(&self, envelope: Envelope) -> Result<()> {
        self.tx
            .send(BackendRequest::Notify(envelope))
            .map_err(|_| BridgeError::Disconnected)
    }

    async fn request(&self, envelope: Envelope) -> Result<Value> {
        let capability = envelope.capability;
        let (reply, response) = oneshot::channel();
        self.tx
            .send(BackendRequest::Invoke { envelope, reply })
            .map_err(|_| BridgeError::Disconnected)?;

        debug!(capability = %capability, "Awaiting back-end reply");
        response.await.map_err(|_| BridgeError::NoReply)?
    }
}
