//! Accept-time Origin and Host policy

use std::collections::HashSet;

use crate::error::RejectReason;

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Decides whether a connection attempt may proceed to the handshake.
///
/// Matching is exact and case-sensitive. When an Origin is present it alone
/// decides; without one, the Host must name loopback.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_origins: HashSet<String>,
    allowed_hosts: HashSet<String>,
    trusted_schemes: Vec<String>,
}

impl AccessPolicy {
    /// Build the policy for a listener on `port`
    pub fn new<I, S>(port: u16, trusted_schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allowed_hosts = HashSet::new();
        for host in LOOPBACK_HOSTS {
            allowed_hosts.insert(host.to_string());
            allowed_hosts.insert(format!("{host}:{port}"));
        }

        let mut allowed_origins = HashSet::new();
        for scheme in ["http", "https"] {
            for host in &allowed_hosts {
                allowed_origins.insert(format!("{scheme}://{host}"));
            }
        }

        let trusted_schemes = trusted_schemes
            .into_iter()
            .map(Into::into)
            .filter(|scheme: &String| !scheme.is_empty())
            .collect();

        Self {
            allowed_origins,
            allowed_hosts,
            trusted_schemes,
        }
    }

    /// Check the Origin and Host presented by an attempt
    pub fn check(&self, origin: Option<&str>, host: Option<&str>) -> Result<(), RejectReason> {
        match (origin, host) {
            (Some(origin), _) if self.is_origin_allowed(origin) => Ok(()),
            (Some(_), _) => Err(RejectReason::Origin),
            (None, Some(host)) if self.is_host_allowed(host) => Ok(()),
            (None, _) => Err(RejectReason::Host),
        }
    }

    /// Loopback HTTP(S) origin, or a trusted front-end scheme
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.contains(origin)
            || self
                .trusted_schemes
                .iter()
                .any(|scheme| origin.starts_with(scheme.as_str()))
    }

    /// Loopback host name with no port or the listener's own port
    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.contains(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::new(7681, ["app://"])
    }

    #[test]
    fn test_loopback_origins_allowed() {
        let policy = policy();
        for origin in [
            "http://localhost",
            "http://localhost:7681",
            "https://127.0.0.1",
            "https://127.0.0.1:7681",
            "http://[::1]:7681",
        ] {
            assert!(policy.is_origin_allowed(origin), "{origin} should be allowed");
        }
    }

    #[test]
    fn test_foreign_origins_rejected() {
        let policy = policy();
        for origin in [
            "http://attacker.example",
            "http://localhost:9999",
            "http://localhost.attacker.example",
            "http://127.0.0.1.nip.io",
            "HTTP://LOCALHOST",
            "null",
            "",
            "ws://localhost:7681",
        ] {
            assert!(!policy.is_origin_allowed(origin), "{origin} should be rejected");
        }
    }

    #[test]
    fn test_trusted_scheme_prefix() {
        let policy = policy();
        assert!(policy.is_origin_allowed("app://termgate"));
        assert!(!policy.is_origin_allowed("apps://termgate"));
        assert!(!policy.is_origin_allowed("file:///home/user/index.html"));
    }

    #[test]
    fn test_empty_scheme_is_ignored() {
        let policy = AccessPolicy::new(80, [""]);
        assert!(!policy.is_origin_allowed("http://attacker.example"));
    }

    #[test]
    fn test_origin_takes_precedence_over_host() {
        let policy = policy();
        assert_eq!(
            policy.check(Some("http://attacker.example"), Some("localhost:7681")),
            Err(RejectReason::Origin)
        );
        assert_eq!(policy.check(Some("http://localhost:7681"), Some("evil.example")), Ok(()));
    }

    #[test]
    fn test_host_fallback() {
        let policy = policy();
        assert_eq!(policy.check(None, Some("localhost:7681")), Ok(()));
        assert_eq!(policy.check(None, Some("127.0.0.1")), Ok(()));
        assert_eq!(policy.check(None, Some("[::1]:7681")), Ok(()));
        assert_eq!(policy.check(None, Some("localhost:1234")), Err(RejectReason::Host));
        assert_eq!(policy.check(None, Some("example.com")), Err(RejectReason::Host));
        assert_eq!(policy.check(None, None), Err(RejectReason::Host));
    }
}
