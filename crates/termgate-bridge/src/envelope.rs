//! Envelope crossing the trust boundary

use serde::Serialize;
use serde_json::Value;
use termgate_capabilities::Capability;

/// An admitted capability plus its arguments.
///
/// Only the bridge builds envelopes, and only after the capability passed the
/// registry, so holding an `Envelope` means the name was allowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Envelope {
    pub capability: Capability,
    pub args: Vec<Value>,
}

impl Envelope {
    pub(crate) fn new(capability: Capability, args: Vec<Value>) -> Self {
        Self { capability, args }
    }
}
