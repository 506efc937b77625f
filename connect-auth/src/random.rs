//! Source of cryptographic randomness for tokens and verifiers.

use rand::RngCore;

/// Capability to fill a buffer with random bytes.
///
/// Flow code never reaches for a global generator directly so tests can
/// substitute a deterministic source.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(dest);
    }
}

/// Draw `N` random bytes from `source`.
pub fn random_bytes<R: RandomSource + ?Sized, const N: usize>(source: &R) -> [u8; N] {
    let mut bytes = [0u8; N];
    source.fill_bytes(&mut bytes);
    bytes
}
