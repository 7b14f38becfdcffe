//! In-memory audit log

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use super::models::{AuditAction, AuditRecord, Operation};

/// Records kept before the oldest are discarded
pub const DEFAULT_AUDIT_CAPACITY: usize = 1024;

/// Longest capability name stored verbatim
pub const MAX_RECORDED_NAME_LEN: usize = 128;

/// Bounded audit log for capability checks. Clones share the same records.
///
/// Denials are also kept in a ring of their own, so a burst of admitted
/// calls cannot push them out.
#[derive(Debug, Clone)]
pub struct AuditLog {
    rings: Arc<RwLock<Rings>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Rings {
    all: VecDeque<AuditRecord>,
    denied: VecDeque<AuditRecord>,
}

fn push_bounded(ring: &mut VecDeque<AuditRecord>, record: AuditRecord, capacity: usize) {
    while ring.len() >= capacity {
        ring.pop_front();
    }
    ring.push_back(record);
}

impl AuditLog {
    /// Create a new audit log with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Create a new audit log holding at most `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rings: Arc::new(RwLock::new(Rings::default())),
            capacity,
        }
    }

    /// Record an admitted call
    pub fn record_dispatched(&self, capability: &str, operation: Operation) {
        let record = AuditRecord::new(capability.to_string(), operation, AuditAction::Dispatched);
        push_bounded(&mut self.rings.write().all, record, self.capacity);
    }

    /// Record a rejected call. The name is untrusted and stored sanitized.
    pub fn record_denied(&self, capability: &str, operation: Operation) -> AuditRecord {
        let record = AuditRecord::new(sanitize_name(capability), operation, AuditAction::Denied);
        let mut rings = self.rings.write();
        push_bounded(&mut rings.all, record.clone(), self.capacity);
        push_bounded(&mut rings.denied, record.clone(), self.capacity);
        record
    }

    /// Get the most recent records of either kind, oldest first
    pub fn entries(&self) -> Vec<AuditRecord> {
        self.rings.read().all.iter().cloned().collect()
    }

    /// Get the most recent denial records, oldest first
    pub fn denials(&self) -> Vec<AuditRecord> {
        self.rings.read().denied.iter().cloned().collect()
    }

    /// Get the number of records in [`AuditLog::entries`]
    pub fn len(&self) -> usize {
        self.rings.read().all.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        let rings = self.rings.read();
        rings.all.is_empty() && rings.denied.is_empty()
    }

    /// Clear all records
    pub fn clear(&self) {
        let mut rings = self.rings.write();
        rings.all.clear();
        rings.denied.clear();
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Make an untrusted name safe to store and log: truncated to
/// [`MAX_RECORDED_NAME_LEN`] characters with control characters escaped.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_RECORDED_NAME_LEN + 3));
    let mut chars = name.chars();
    for c in chars.by_ref().take(MAX_RECORDED_NAME_LEN) {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}
