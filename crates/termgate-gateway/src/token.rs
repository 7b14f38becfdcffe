//! Pre-shared session token

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;

/// High-entropy secret generated once per gateway.
///
/// The value is only reachable through [`expose`](Self::expose); `Debug`
/// output is redacted so it cannot leak through logs.
#[derive(Clone)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate 256 bits from the OS RNG, hex encoded
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The secret, for handing to the front end out of band
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a presented candidate
    pub fn verify(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}
