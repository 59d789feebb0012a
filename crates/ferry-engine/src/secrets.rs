//! Secret generation for the relay's pairing table.
//!
//! Mirrors `examples/original_source/pkg/proxy/secret.go`: a random
//! generator guarded by an internal mutex (the PRNG itself isn't safe
//! for concurrent use), plus a fixed generator for tests.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default alphabet: lowercase ASCII letters and digits.
pub const DEFAULT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Default secret length in characters.
pub const DEFAULT_LENGTH: usize = 6;

/// A source of relay secrets.
pub trait Secrets: Send + Sync {
    fn generate(&self) -> String;
}

/// Generates random secrets of a configurable length and alphabet.
///
/// Uniqueness is probabilistic — with the default length-6 `[a-z0-9]`
/// alphabet the space is 36^6 ≈ 2.2e9. Duplicates are detected and
/// rejected at Join time by the pairing table, so engine correctness
/// never depends on this generator producing unique values.
pub struct RandomSecrets {
    length: usize,
    alphabet: Vec<u8>,
    rng: Mutex<StdRng>,
}

impl RandomSecrets {
    /// Build a generator with an explicit seed — deterministic, for tests.
    pub fn new_seeded(length: usize, alphabet: &[u8], seed: u64) -> Self {
        Self {
            length,
            alphabet: alphabet.to_vec(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Build a generator seeded from OS entropy, for production use.
    pub fn new(length: usize, alphabet: &[u8]) -> Self {
        Self {
            length,
            alphabet: alphabet.to_vec(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }
}

impl Default for RandomSecrets {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH, DEFAULT_ALPHABET)
    }
}

impl Secrets for RandomSecrets {
    fn generate(&self) -> String {
        let mut rng = self.rng.lock().expect("secrets rng mutex poisoned");
        (0..self.length)
            .map(|_| {
                let idx = rng.random_range(0..self.alphabet.len());
                self.alphabet[idx] as char
            })
            .collect()
    }
}

/// Always returns the same secret. Used in tests where a deterministic
/// secret is needed to exercise join/duplicate/unknown-secret paths.
pub struct FixedSecrets(String);

impl FixedSecrets {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl Secrets for FixedSecrets {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secrets_have_the_configured_length_and_alphabet() {
        let gen = RandomSecrets::new_seeded(6, DEFAULT_ALPHABET, 42);
        for _ in 0..100 {
            let s = gen.generate();
            assert_eq!(s.len(), 6);
            assert!(s.bytes().all(|b| DEFAULT_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = RandomSecrets::new_seeded(6, DEFAULT_ALPHABET, 7);
        let b = RandomSecrets::new_seeded(6, DEFAULT_ALPHABET, 7);
        assert_eq!(a.generate(), b.generate());
    }

    #[test]
    fn fixed_secrets_always_returns_the_same_value() {
        let gen = FixedSecrets::new("abc123");
        assert_eq!(gen.generate(), "abc123");
        assert_eq!(gen.generate(), "abc123");
    }
}
