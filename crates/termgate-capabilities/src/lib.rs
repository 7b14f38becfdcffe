//! Capability registry for termgate
//!
//! A capability is an operation name that may legally cross the trust
//! boundary between the untrusted front end and the privileged back end.
//! The set is closed: every capability is a variant of [`Capability`], and a
//! [`CapabilityRegistry`] is fixed at construction with no way to add or
//! remove members afterwards.
//!
//! Typed call sites name capabilities directly (`Capability::TerminalResize`),
//! so an unknown name is a compile error there. Names arriving as data from
//! the untrusted side go through [`CapabilityRegistry::resolve`] instead.

pub mod capability;
pub mod error;
pub mod registry;

pub use capability::{Capability, Direction, Domain};
pub use error::{CapabilityError, Result};
pub use registry::{CapabilityQuery, CapabilityRegistry};
