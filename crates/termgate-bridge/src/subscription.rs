//! Listener table and cancellable subscription handles

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use termgate_capabilities::Capability;

pub(crate) type Callback = Arc<dyn Fn(&[Value]) + Send + Sync>;

struct Listener {
    id: u64,
    callback: Callback,
    once: bool,
}

/// Listeners keyed by capability
#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<Capability, Vec<Listener>>>,
}

impl ListenerTable {
    pub(crate) fn add(&self, capability: Capability, callback: Callback, once: bool) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(capability)
            .or_default()
            .push(Listener { id, callback, once });
        id
    }

    pub(crate) fn remove(&self, capability: Capability, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(&capability) else {
            return false;
        };
        let before = list.len();
        list.retain(|listener| listener.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(&capability);
        }
        removed
    }

    /// Deliver to every listener of `capability`, returning how many ran.
    ///
    /// Once-listeners are unlinked while the lock is held, so concurrent
    /// deliveries cannot both see them. Callbacks run after the lock is
    /// released and may subscribe or cancel freely.
    pub(crate) fn deliver(&self, capability: Capability, args: &[Value]) -> usize {
        let callbacks: Vec<Callback> = {
            let mut listeners = self.listeners.lock();
            let Some(list) = listeners.get_mut(&capability) else {
                return 0;
            };
            let callbacks = list.iter().map(|l| Arc::clone(&l.callback)).collect();
            list.retain(|listener| !listener.once);
            if list.is_empty() {
                listeners.remove(&capability);
            }
            callbacks
        };

        for callback in &callbacks {
            callback(args);
        }
        callbacks.len()
    }

    pub(crate) fn count(&self, capability: Capability) -> usize {
        self.listeners
            .lock()
            .get(&capability)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(capability, list)| (capability.as_str(), list.len()))
            .collect();
        f.debug_struct("ListenerTable").field("listeners", &counts).finish()
    }
}

/// Handle to one registered listener. Its only operation is cancellation.
///
/// Dropping the handle leaves the listener registered.
#[must_use = "a subscription can only be cancelled through its handle"]
#[derive(Debug)]
pub struct Subscription {
    capability: Capability,
    id: u64,
    table: Weak<ListenerTable>,
}

impl Subscription {
    pub(crate) fn new(capability: Capability, id: u64, table: &Arc<ListenerTable>) -> Self {
        Self {
            capability,
            id,
            table: Arc::downgrade(table),
        }
    }

    /// Capability this subscription listens to
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Remove exactly this listener. Returns `false` if it was already gone
    /// (a fired once-listener, or a dropped bridge).
    pub fn cancel(self) -> bool {
        match self.table.upgrade() {
            Some(table) => table.remove(self.capability, self.id),
            None => false,
        }
    }
}
