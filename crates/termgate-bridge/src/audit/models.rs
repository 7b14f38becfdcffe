//! Audit log data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// The call was admitted and handed to the back end (or listeners)
    Dispatched,
    /// The capability was not registered
    Denied,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Dispatched => write!(f, "dispatched"),
            AuditAction::Denied => write!(f, "denied"),
        }
    }
}

/// Bridge operation being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Send,
    Invoke,
    On,
    Once,
    Emit,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Send => "send",
            Operation::Invoke => "invoke",
            Operation::On => "on",
            Operation::Once => "once",
            Operation::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// Entry in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier for this record
    pub id: Uuid,
    /// Timestamp of the check
    pub timestamp: DateTime<Utc>,
    /// Capability name as presented (sanitized)
    pub capability: String,
    /// Bridge operation
    pub operation: Operation,
    /// Outcome
    pub action: AuditAction,
}

impl AuditRecord {
    /// Create a new audit record stamped now
    pub fn new(capability: String, operation: Operation, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            capability,
            operation,
            action,
        }
    }

    /// Check if this record is a denial
    pub fn is_denial(&self) -> bool {
        self.action == AuditAction::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = AuditRecord::new("file:read".to_string(), Operation::Invoke, AuditAction::Denied);
        assert_eq!(record.capability, "file:read");
        assert_eq!(record.operation, Operation::Invoke);
        assert!(record.is_denial());
    }

    #[test]
    fn test_record_serialization() {
        let record = AuditRecord::new("system:cwd".to_string(), Operation::Send, AuditAction::Dispatched);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action"], "dispatched");
        assert_eq!(json["operation"], "send");
        assert_eq!(json["capability"], "system:cwd");
    }

    #[test]
    fn test_display() {
        assert_eq!(AuditAction::Denied.to_string(), "denied");
        assert_eq!(Operation::Once.to_string(), "once");
    }
}
