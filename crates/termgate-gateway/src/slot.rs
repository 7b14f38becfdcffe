//! Single-connection slot

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle of an accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    AwaitingAuth,
    Authenticated,
    Active,
    Closed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, AwaitingAuth)
                | (AwaitingAuth, Authenticated)
                | (Authenticated, Active)
                | (Connecting | AwaitingAuth | Authenticated | Active, Closed)
        )
    }
}

/// Bookkeeping for the connection occupying the slot
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: Uuid,
    pub state: ConnectionState,
    pub origin: Option<String>,
    pub host: Option<String>,
    pub peer: SocketAddr,
    pub created_at: DateTime<Utc>,
    pub auth_deadline: Option<DateTime<Utc>>,
}

/// Holds at most one live connection process-wide.
///
/// Check-and-set happens under one mutex; the winner gets a [`SlotGuard`]
/// that frees the slot when dropped.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSlot {
    inner: Arc<Mutex<Option<ConnectionInfo>>>,
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if a connection already holds it
    pub fn try_acquire(
        &self,
        origin: Option<String>,
        host: Option<String>,
        peer: SocketAddr,
    ) -> Option<SlotGuard> {
        let mut current = self.inner.lock();
        if current.is_some() {
            return None;
        }

        let id = Uuid::new_v4();
        *current = Some(ConnectionInfo {
            id,
            state: ConnectionState::Connecting,
            origin,
            host,
            peer,
            created_at: Utc::now(),
            auth_deadline: None,
        });
        debug!(connection_id = %id, peer = %peer, "Connection slot acquired");

        Some(SlotGuard {
            slot: self.clone(),
            id,
        })
    }

    /// Whether a connection currently holds the slot
    pub fn is_occupied(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Snapshot of the current connection
    pub fn current(&self) -> Option<ConnectionInfo> {
        self.inner.lock().clone()
    }

    /// State of the current connection
    pub fn state(&self) -> Option<ConnectionState> {
        self.inner.lock().as_ref().map(|info| info.state)
    }
}

/// Ownership of the slot for one connection. Dropping it frees the slot.
#[derive(Debug)]
pub struct SlotGuard {
    slot: ConnectionSlot,
    id: Uuid,
}

impl SlotGuard {
    /// Connection identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state of this connection
    pub fn state(&self) -> ConnectionState {
        self.with_info(|info| info.state)
            .unwrap_or(ConnectionState::Closed)
    }

    /// Advance the state machine. Illegal steps are refused and logged.
    pub fn transition(&self, next: ConnectionState) -> bool {
        let moved = self
            .with_info(|info| {
                if info.state.can_transition_to(next) {
                    info.state = next;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);

        if moved {
            debug!(connection_id = %self.id, state = ?next, "Connection state changed");
        } else {
            warn!(connection_id = %self.id, state = ?next, "Refused connection state change");
        }
        moved
    }

    /// Enter AwaitingAuth with the given deadline
    pub fn begin_auth(&self, deadline: DateTime<Utc>) -> bool {
        if !self.transition(ConnectionState::AwaitingAuth) {
            return false;
        }
        self.with_info(|info| info.auth_deadline = Some(deadline));
        true
    }

    /// Leave AwaitingAuth, clearing the deadline
    pub fn authenticated(&self) -> bool {
        if !self.transition(ConnectionState::Authenticated) {
            return false;
        }
        self.with_info(|info| info.auth_deadline = None);
        true
    }

    /// Mark Closed and free the slot
    pub fn close(self) {
        self.transition(ConnectionState::Closed);
    }

    fn with_info<R>(&self, f: impl FnOnce(&mut ConnectionInfo) -> R) -> Option<R> {
        let mut current = self.slot.inner.lock();
        match current.as_mut() {
            Some(info) if info.id == self.id => Some(f(info)),
            _ => None,
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut current = self.slot.inner.lock();
        if current.as_ref().is_some_and(|info| info.id == self.id) {
            *current = None;
            debug!(connection_id = %self.id, "Connection slot released");
        }
    }
}
