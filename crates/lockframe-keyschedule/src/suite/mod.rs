//! The cipher suite capability consumed by the key schedule.
//!
//! The schedule never touches a hash function or KEM directly. Everything
//! goes through [`CipherSuite`], which exposes the raw HKDF-style primitives,
//! the suite hash, and the HPKE operations needed for external joins. Label
//! framing (`ExpandWithLabel`) is built on top of these in [`crate::Secret`].

pub mod rust_crypto;

pub use rust_crypto::RustCryptoSuite;
use zeroize::Zeroize;

use crate::error::KeyScheduleError;

/// Prefix prepended to every `ExpandWithLabel` label
pub const LABEL_PREFIX: &str = "MLS 1.0 ";

/// HPKE exporter label for the external init secret
pub const EXTERNAL_INIT_EXPORT_LABEL: &[u8] = b"MLS 1.0 external init secret";

/// Cryptographic capability of one MLS cipher suite.
///
/// Implementations must be pure: the same inputs always produce the same
/// outputs, except for the sender side of the KEM which draws fresh
/// randomness.
pub trait CipherSuite {
    /// IANA identifier of the suite. Two suites compare equal iff their ids do.
    fn suite_id(&self) -> u16;

    /// KDF output length `Nh`.
    fn hash_length(&self) -> usize;

    /// AEAD key length `Nk`.
    fn aead_key_size(&self) -> usize;

    /// AEAD nonce length `Nn`.
    fn aead_nonce_size(&self) -> usize;

    /// `KDF.Extract(salt, ikm)`.
    fn extract(&self, salt: &[u8], ikm: &[u8]) -> Result<Vec<u8>, KeyScheduleError>;

    /// `KDF.Expand(prk, info, length)`.
    fn expand(&self, prk: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>, KeyScheduleError>;

    /// Suite hash of `data`.
    fn hash(&self, data: &[u8]) -> Result<Vec<u8>, KeyScheduleError>;

    /// HPKE `SetupBaseS` to `public_key` followed by an export.
    ///
    /// Returns `(kem_output, exported_secret)`.
    fn kem_export_sender(
        &self,
        public_key: &[u8],
        export_context: &[u8],
        length: usize,
    ) -> Result<(Vec<u8>, Vec<u8>), KeyScheduleError>;

    /// HPKE `SetupBaseR` for `kem_output` with `key_pair` followed by an
    /// export.
    fn kem_export_receiver(
        &self,
        kem_output: &[u8],
        key_pair: &KemKeyPair,
        export_context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KeyScheduleError>;

    /// HPKE `DeriveKeyPair(seed)`.
    fn derive_key_pair(&self, seed: &[u8]) -> Result<KemKeyPair, KeyScheduleError>;
}

/// HPKE key pair derived from an epoch's external secret.
///
/// The private half is zeroized on drop. There is no equality: two key pairs
/// derived from the same seed are compared through their public keys.
#[derive(Clone)]
pub struct KemKeyPair {
    private: Vec<u8>,
    public: Vec<u8>,
}

impl KemKeyPair {
    /// Assemble a key pair from raw HPKE key bytes.
    pub fn new(private: Vec<u8>, public: Vec<u8>) -> Self {
        Self { private, public }
    }

    /// Serialized public key.
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    pub(crate) fn private_key(&self) -> &[u8] {
        &self.private
    }
}

impl std::fmt::Debug for KemKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemKeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

impl Drop for KemKeyPair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}
