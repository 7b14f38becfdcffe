//! Back-end dispatch from capability to handler

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use termgate_capabilities::Capability;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::BackendRequest;
use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};
use crate::handlers;

/// Back-end implementation of one capability.
///
/// Argument validation belongs here; the bridge only checks the name.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, args: Vec<Value>) -> std::result::Result<Value, String>;
}

/// Handler wrapping a synchronous closure
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(Vec<Value>) -> std::result::Result<Value, String> + Send + Sync,
{
    async fn handle(&self, args: Vec<Value>) -> std::result::Result<Value, String> {
        (self.f)(args)
    }
}

/// Wrap a closure as a [`Handler`]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Vec<Value>) -> std::result::Result<Value, String> + Send + Sync,
{
    FnHandler { f }
}

/// Routes admitted envelopes to their handlers
#[derive(Default, Clone)]
pub struct HandlerRouter {
    handlers: HashMap<Capability, Arc<dyn Handler>>,
}

impl HandlerRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router with the built-in `system:*` handlers
    pub fn with_system_handlers() -> Self {
        Self::new()
            .route(Capability::SystemInfo, handlers::SystemInfoHandler)
            .route(Capability::SystemCwd, handlers::CwdHandler)
            .route(Capability::SystemEnv, handlers::EnvHandler)
    }

    /// Builder-style [`register`](Self::register)
    pub fn route(mut self, capability: Capability, handler: impl Handler + 'static) -> Self {
        self.register(capability, handler);
        self
    }

    /// Register (or replace) the handler for a capability
    pub fn register(&mut self, capability: Capability, handler: impl Handler + 'static) {
        self.handlers.insert(capability, Arc::new(handler));
    }

    /// Check if a capability has a handler
    pub fn handles(&self, capability: Capability) -> bool {
        self.handlers.contains_key(&capability)
    }

    /// Run the handler for one envelope
    pub async fn dispatch(&self, envelope: Envelope) -> Result<Value> {
        let handler = self
            .handlers
            .get(&envelope.capability)
            .ok_or(BridgeError::NoHandler(envelope.capability))?;

        handler.handle(envelope.args).await.map_err(BridgeError::Backend)
    }

    /// Drain a [`ChannelBackend`](crate::ChannelBackend) queue until every
    /// sender is gone. Requests are handled one at a time, in arrival order.
    pub async fn serve(&self, mut requests: mpsc::UnboundedReceiver<BackendRequest>) {
        while let Some(request) = requests.recv().await {
            match request {
                BackendRequest::Notify(envelope) => {
                    let capability = envelope.capability;
                    if let Err(e) = self.dispatch(envelope).await {
                        warn!(capability = %capability, error = %e, "Notification handler failed");
                    }
                }
                BackendRequest::Invoke { envelope, reply } => {
                    let capability = envelope.capability;
                    let result = self.dispatch(envelope).await;
                    if reply.send(result).is_err() {
                        debug!(capability = %capability, "Invoker went away before the reply");
                    }
                }
            }
        }
        debug!("Back-end request queue closed");
    }
}

impl std::fmt::Debug for HandlerRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routes: Vec<_> = self.handlers.keys().map(|c| c.as_str()).collect();
        routes.sort_unstable();
        f.debug_struct("HandlerRouter").field("routes", &routes).finish()
    }
}
