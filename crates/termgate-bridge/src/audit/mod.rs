//! Audit trail for capability checks

pub mod log;
pub mod models;

pub use log::{sanitize_name, AuditLog, DEFAULT_AUDIT_CAPACITY, MAX_RECORDED_NAME_LEN};
pub use models::{AuditAction, AuditRecord, Operation};
