//! Immutable capability registry

use crate::capability::{Capability, Domain};
use crate::error::{CapabilityError, Result};

/// The full capability set, fixed at compile time.
static STANDARD: CapabilityRegistry = CapabilityRegistry::from_slice(&Capability::ALL);

/// A closed set of capabilities allowed across the trust boundary.
///
/// Membership is a bitmask decided once at construction. There is no
/// insertion or removal API; a different set means a different registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityRegistry {
    members: u32,
}

impl CapabilityRegistry {
    /// The process-wide registry containing every known capability
    pub fn standard() -> &'static CapabilityRegistry {
        &STANDARD
    }

    /// Build a registry restricted to the given capabilities
    pub fn from_capabilities<I>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = Capability>,
    {
        let members = capabilities
            .into_iter()
            .fold(0u32, |acc, capability| acc | capability.bit());
        Self { members }
    }

    const fn from_slice(capabilities: &[Capability]) -> Self {
        let mut members = 0u32;
        let mut i = 0;
        while i < capabilities.len() {
            members |= capabilities[i].bit();
            i += 1;
        }
        Self { members }
    }

    /// Whether `name` is a registered capability. Pure and total: any input,
    /// including garbage from the untrusted side, yields a plain answer.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Resolve an untrusted name to a registered capability
    pub fn resolve(&self, name: &str) -> Option<Capability> {
        Capability::from_name(name).filter(|capability| self.contains(*capability))
    }

    /// Whether a typed capability is a member
    pub const fn contains(&self, capability: Capability) -> bool {
        self.members & capability.bit() != 0
    }

    /// Admit a capability query or fail with a generic denial
    pub fn admit<Q>(&self, query: &Q) -> Result<Capability>
    where
        Q: CapabilityQuery + ?Sized,
    {
        query.lookup(self).ok_or(CapabilityError::Denied)
    }

    /// Registered capabilities in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }

    /// Registered capabilities within one domain
    pub fn by_domain(&self, domain: Domain) -> Vec<Capability> {
        self.iter()
            .filter(|capability| capability.domain() == domain)
            .collect()
    }

    /// Number of registered capabilities
    pub fn len(&self) -> usize {
        self.members.count_ones() as usize
    }

    /// Whether no capability is registered
    pub fn is_empty(&self) -> bool {
        self.members == 0
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        STANDARD
    }
}

/// Something that may name a capability: either a typed [`Capability`] or a
/// raw name received from the untrusted side.
pub trait CapabilityQuery {
    /// Resolve against `registry`, returning `None` when not a member
    fn lookup(&self, registry: &CapabilityRegistry) -> Option<Capability>;

    /// The name as presented, for diagnostics
    fn display_name(&self) -> &str;
}

impl CapabilityQuery for Capability {
    fn lookup(&self, registry: &CapabilityRegistry) -> Option<Capability> {
        registry.contains(*self).then_some(*self)
    }

    fn display_name(&self) -> &str {
        self.as_str()
    }
}

impl CapabilityQuery for str {
    fn lookup(&self, registry: &CapabilityRegistry) -> Option<Capability> {
        registry.resolve(self)
    }

    fn display_name(&self) -> &str {
        self
    }
}

impl CapabilityQuery for String {
    fn lookup(&self, registry: &CapabilityRegistry) -> Option<Capability> {
        registry.resolve(self)
    }

    fn display_name(&self) -> &str {
        self
    }
}

impl<T: CapabilityQuery + ?Sized> CapabilityQuery for &T {
    fn lookup(&self, registry: &CapabilityRegistry) -> Option<Capability> {
        (**self).lookup(registry)
    }

    fn display_name(&self) -> &str {
        (**self).display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_every_capability() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(registry.len(), Capability::ALL.len());
        for capability in Capability::ALL {
            assert!(registry.contains(capability));
            assert!(registry.is_allowed(capability.as_str()));
        }
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let registry = CapabilityRegistry::standard();
        assert!(!registry.is_allowed(""));
        assert!(!registry.is_allowed("shell:exec"));
        assert!(!registry.is_allowed("terminal:"));
        assert!(!registry.is_allowed("terminal:execute\0"));
        assert!(!registry.is_allowed("__proto__"));
    }

    #[test]
    fn test_restricted_registry() {
        let registry = CapabilityRegistry::from_capabilities([
            Capability::SystemInfo,
            Capability::TerminalData,
        ]);

        assert_eq!(registry.len(), 2);
        assert!(registry.is_allowed("system:info"));
        assert!(registry.is_allowed("terminal:data"));
        assert!(!registry.is_allowed("file:read"));
        assert!(!registry.contains(Capability::FileRead));
    }

    #[test]
    fn test_admit_typed_and_raw() {
        let registry = CapabilityRegistry::from_capabilities([Capability::SystemCwd]);

        assert_eq!(registry.admit(&Capability::SystemCwd), Ok(Capability::SystemCwd));
        assert_eq!(registry.admit("system:cwd"), Ok(Capability::SystemCwd));
        assert_eq!(registry.admit(&"system:cwd".to_string()), Ok(Capability::SystemCwd));

        assert_eq!(registry.admit(&Capability::SystemEnv), Err(CapabilityError::Denied));
        assert_eq!(registry.admit("system:env"), Err(CapabilityError::Denied));
        assert_eq!(registry.admit("nonsense"), Err(CapabilityError::Denied));
    }

    #[test]
    fn test_denial_does_not_distinguish_unknown_from_unregistered() {
        let registry = CapabilityRegistry::from_capabilities([Capability::SystemCwd]);

        let unregistered = registry.admit("file:read").unwrap_err();
        let unknown = registry.admit("file:format").unwrap_err();
        assert_eq!(unregistered, unknown);
        assert_eq!(unregistered.to_string(), unknown.to_string());
    }

    #[test]
    fn test_by_domain() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(
            registry.by_domain(Domain::System),
            vec![Capability::SystemInfo, Capability::SystemCwd, Capability::SystemEnv]
        );
        assert_eq!(registry.by_domain(Domain::File).len(), 5);
        assert_eq!(registry.by_domain(Domain::Socket).len(), 4);
        assert_eq!(registry.by_domain(Domain::Session).len(), 6);
    }

    #[test]
    fn test_empty_registry() {
        let registry = CapabilityRegistry::from_capabilities([]);
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
        assert!(!registry.is_allowed("system:info"));
    }

    #[test]
    fn test_default_is_standard() {
        assert_eq!(CapabilityRegistry::default(), *CapabilityRegistry::standard());
    }
}
