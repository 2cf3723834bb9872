//! Opaque mined hash values.

use rand::Rng;
use std::fmt;

/// The opaque value a round's winner publishes.
///
/// Stands in for a real block hash or authority signature; only equality
/// and modular arithmetic matter to the coordination core, so the value
/// is a plain `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashValue(pub u64);

impl HashValue {
    /// Sentinel for "no value has ever been produced".
    pub const UNINIT: Self = HashValue(u64::MAX);

    /// Draw a fresh candidate value. The sentinel is never minted.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut value: u64 = rng.gen();
        while value == Self::UNINIT.0 {
            value = rng.gen();
        }
        Self(value)
    }

    /// Check if this is the uninitialized sentinel.
    pub fn is_uninit(&self) -> bool {
        *self == Self::UNINIT
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_uninit() {
            write!(f, "uninit")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
