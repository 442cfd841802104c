//! Per-leaf hash ratchet for forward-secure message keys
//!
//! # Security Properties
//!
//! - Forward Secrecy: the chain secret is replaced (and the old one zeroized)
//!   on every step
//! - Key Uniqueness: the generation is bound into every derivation
//! - Determinism: the same ratchet secret always produces the same sequence

use crate::{error::KeySetError, secret::Secret, suite::CipherSuite};

/// Label for deriving a message key
const KEY_LABEL: &str = "key";

/// Label for deriving a message nonce
const NONCE_LABEL: &str = "nonce";

/// Label for deriving the next chain secret
const SECRET_LABEL: &str = "secret";

/// Default number of generations a ratchet may skip when catching up.
pub const DEFAULT_MAX_FORWARD_SKIP: u32 = 1000;

/// Ratchet configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatchetConfig {
    /// Largest jump [`HashRatchet::get`] will make past the current generation
    pub max_forward_skip: u32,
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self { max_forward_skip: DEFAULT_MAX_FORWARD_SKIP }
    }
}

/// AEAD key and nonce for one ratchet generation.
///
/// Used for a single message and then dropped, which zeroizes both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGeneration {
    /// Ratchet generation the key was derived at
    pub generation: u32,
    /// AEAD key, `Nk` bytes
    pub key: Secret,
    /// AEAD nonce, `Nn` bytes
    pub nonce: Secret,
}

/// Forward-secure hash ratchet.
///
/// Each [`next()`](Self::next) call:
/// 1. Derives key and nonce from the current chain secret
/// 2. Derives the next chain secret
/// 3. Drops the old chain secret (zeroized)
pub struct HashRatchet<S: CipherSuite> {
    suite: S,
    config: RatchetConfig,
    /// Current chain secret
    secret: Secret,
    /// Number of `next()` calls so far
    generation: u32,
}

impl<S: CipherSuite> HashRatchet<S> {
    /// Start a ratchet at generation 0 from `secret`.
    pub fn new(suite: S, secret: Secret, config: RatchetConfig) -> Self {
        Self { suite, config, secret, generation: 0 }
    }

    /// Next generation this ratchet will produce.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Produce the key for the current generation and step forward.
    pub fn next(&mut self) -> Result<KeyGeneration, KeySetError> {
        if self.generation == u32::MAX {
            return Err(KeySetError::GenerationOverflow { current: self.generation });
        }

        let generation = self.generation;
        let context = generation.to_be_bytes();

        let key = self.derive(KEY_LABEL, &context, self.suite.aead_key_size())?;
        let nonce = self.derive(NONCE_LABEL, &context, self.suite.aead_nonce_size())?;
        let next_secret = self.derive(SECRET_LABEL, &context, self.suite.hash_length())?;

        // Old chain secret is zeroized when dropped here
        self.secret = next_secret;
        self.generation = generation + 1;

        Ok(KeyGeneration { generation, key, nonce })
    }

    /// Skip forward to `target` and return its key.
    ///
    /// Used for out-of-order messages. Generations already passed cannot be
    /// recovered, and jumps beyond `max_forward_skip` are refused.
    pub fn get(&mut self, target: u32) -> Result<KeyGeneration, KeySetError> {
        if target < self.generation {
            return Err(KeySetError::GenerationTooOld {
                current: self.generation,
                requested: target,
            });
        }

        let skip = target - self.generation;
        if skip > self.config.max_forward_skip {
            return Err(KeySetError::GenerationTooFarAhead {
                current: self.generation,
                requested: target,
                max_skip: self.config.max_forward_skip,
            });
        }

        loop {
            let key = self.next()?;
            if key.generation == target {
                return Ok(key);
            }
        }
    }

    fn derive(&self, label: &str, context: &[u8], length: usize) -> Result<Secret, KeySetError> {
        Ok(self.secret.expand_with_label(&self.suite, label, context, length)?)
    }
}

impl<S: CipherSuite> std::fmt::Debug for HashRatchet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRatchet")
            .field("generation", &self.generation)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
