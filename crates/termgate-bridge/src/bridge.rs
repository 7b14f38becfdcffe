//! The gatekeeper bridge

use std::sync::Arc;

use serde_json::Value;
use termgate_capabilities::{Capability, CapabilityQuery, CapabilityRegistry};
use tracing::{debug, warn};

use crate::audit::{AuditLog, Operation};
use crate::backend::Backend;
use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};
use crate::subscription::{ListenerTable, Subscription};

/// Mediates every operation the front end may request of the back end.
///
/// Each call names a capability, either typed ([`Capability`]) or as a raw
/// string from untrusted data. The name is checked against the registry
/// before anything reaches the [`Backend`] or the listener table.
pub struct GatekeeperBridge {
    registry: CapabilityRegistry,
    backend: Arc<dyn Backend>,
    listeners: Arc<ListenerTable>,
    audit: AuditLog,
}

impl GatekeeperBridge {
    /// Create a bridge over the standard registry
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_registry(*CapabilityRegistry::standard(), backend)
    }

    /// Create a bridge over a restricted registry
    pub fn with_registry(registry: CapabilityRegistry, backend: Arc<dyn Backend>) -> Self {
        Self {
            registry,
            backend,
            listeners: Arc::new(ListenerTable::default()),
            audit: AuditLog::new(),
        }
    }

    /// Use the given audit log instead of a private one
    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    /// Fire-and-forget notification to the back end
    pub fn send<Q: CapabilityQuery>(&self, capability: Q, args: Vec<Value>) -> Result<()> {
        let capability = self.admit(&capability, Operation::Send)?;
        self.backend.notify(Envelope::new(capability, args))
    }

    /// Request/reply call to the back end; resolves with exactly one reply
    pub async fn invoke<Q: CapabilityQuery>(&self, capability: Q, args: Vec<Value>) -> Result<Value> {
        let capability = self.admit(&capability, Operation::Invoke)?;
        self.backend.request(Envelope::new(capability, args)).await
    }

    /// Listen for back-end events on a capability
    pub fn on<Q, F>(&self, capability: Q, callback: F) -> Result<Subscription>
    where
        Q: CapabilityQuery,
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let capability = self.admit(&capability, Operation::On)?;
        let id = self.listeners.add(capability, Arc::new(callback), false);
        Ok(Subscription::new(capability, id, &self.listeners))
    }

    /// Like [`on`](Self::on), but the listener removes itself after the
    /// first delivery
    pub fn once<Q, F>(&self, capability: Q, callback: F) -> Result<Subscription>
    where
        Q: CapabilityQuery,
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let capability = self.admit(&capability, Operation::Once)?;
        let id = self.listeners.add(capability, Arc::new(callback), true);
        Ok(Subscription::new(capability, id, &self.listeners))
    }

    /// Deliver a back-end event to the front end's listeners. Returns how
    /// many listeners ran. Unregistered capabilities are dropped and audited.
    pub fn emit<Q: CapabilityQuery>(&self, capability: Q, args: Vec<Value>) -> Result<usize> {
        let capability = self.admit(&capability, Operation::Emit)?;
        Ok(self.listeners.deliver(capability, &args))
    }

    /// Bridge version. Read-only, never checked or audited.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Registry this bridge enforces
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Audit log of checks made by this bridge
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Number of live listeners for a capability
    pub fn listener_count(&self, capability: Capability) -> usize {
        self.listeners.count(capability)
    }

    fn admit<Q: CapabilityQuery>(&self, query: &Q, operation: Operation) -> Result<Capability> {
        match self.registry.admit(query) {
            Ok(capability) => {
                debug!(capability = %capability, operation = %operation, "Capability admitted");
                self.audit.record_dispatched(capability.as_str(), operation);
                Ok(capability)
            }
            Err(_) => {
                let record = self.audit.record_denied(query.display_name(), operation);
                warn!(
                    capability = %record.capability,
                    operation = %operation,
                    "Blocked capability outside the registry"
                );
                Err(BridgeError::CapabilityDenied)
            }
        }
    }
}

impl std::fmt::Debug for GatekeeperBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatekeeperBridge")
            .field("registry", &self.registry)
            .field("listeners", &self.listeners)
            .field("audit_records", &self.audit.len())
            .finish_non_exhaustive()
    }
}
