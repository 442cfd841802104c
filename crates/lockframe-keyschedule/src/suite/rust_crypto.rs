//! [`CipherSuite`] over `hkdf`/`sha2` and the `OpenMLS` `RustCrypto` provider.
//!
//! Extract, expand and hash run directly on the RustCrypto `hkdf` and `sha2`
//! crates. HPKE (the external init KEM) is delegated to `openmls_rust_crypto`
//! so the KEM matches what the MLS layer uses for the same suite.

use std::sync::Arc;

use hkdf::Hkdf;
use openmls_rust_crypto::RustCrypto;
use openmls_traits::{
    crypto::OpenMlsCrypto,
    types::{Ciphersuite, HashType},
};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::{CipherSuite, KemKeyPair};
use crate::error::KeyScheduleError;

/// KDF hash backing a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KdfHash {
    Sha256,
    Sha384,
    Sha512,
}

/// Concrete cipher suite for any MLS suite the `RustCrypto` provider supports.
///
/// Cheap to clone; the provider is shared.
#[derive(Clone)]
pub struct RustCryptoSuite {
    ciphersuite: Ciphersuite,
    hash: KdfHash,
    crypto: Arc<RustCrypto>,
}

impl RustCryptoSuite {
    /// Select `ciphersuite`.
    ///
    /// Fails with [`KeyScheduleError::Suite`] if the provider does not
    /// implement it.
    pub fn new(ciphersuite: Ciphersuite) -> Result<Self, KeyScheduleError> {
        let crypto = RustCrypto::default();
        crypto.supports(ciphersuite).map_err(|e| KeyScheduleError::suite("supports", e))?;

        #[allow(unreachable_patterns)]
        let hash = match ciphersuite.hash_algorithm() {
            HashType::Sha2_256 => KdfHash::Sha256,
            HashType::Sha2_384 => KdfHash::Sha384,
            HashType::Sha2_512 => KdfHash::Sha512,
            other => return Err(KeyScheduleError::suite("hash_algorithm", other)),
        };

        Ok(Self { ciphersuite, hash, crypto: Arc::new(crypto) })
    }

    /// The MLS cipher suite this instance implements.
    pub fn ciphersuite(&self) -> Ciphersuite {
        self.ciphersuite
    }
}

impl Default for RustCryptoSuite {
    /// `MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519`, the mandatory suite.
    fn default() -> Self {
        Self {
            ciphersuite: Ciphersuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519,
            hash: KdfHash::Sha256,
            crypto: Arc::new(RustCrypto::default()),
        }
    }
}

impl std::fmt::Debug for RustCryptoSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustCryptoSuite").field("ciphersuite", &self.ciphersuite).finish()
    }
}

impl PartialEq for RustCryptoSuite {
    fn eq(&self, other: &Self) -> bool {
        self.ciphersuite == other.ciphersuite
    }
}

impl Eq for RustCryptoSuite {}

impl CipherSuite for RustCryptoSuite {
    fn suite_id(&self) -> u16 {
        self.ciphersuite as u16
    }

    fn hash_length(&self) -> usize {
        self.ciphersuite.hash_length()
    }

    fn aead_key_size(&self) -> usize {
        self.ciphersuite.aead_key_length()
    }

    fn aead_nonce_size(&self) -> usize {
        self.ciphersuite.aead_nonce_length()
    }

    fn extract(&self, salt: &[u8], ikm: &[u8]) -> Result<Vec<u8>, KeyScheduleError> {
        let prk = match self.hash {
            KdfHash::Sha256 => Hkdf::<Sha256>::extract(Some(salt), ikm).0.to_vec(),
            KdfHash::Sha384 => Hkdf::<Sha384>::extract(Some(salt), ikm).0.to_vec(),
            KdfHash::Sha512 => Hkdf::<Sha512>::extract(Some(salt), ikm).0.to_vec(),
        };
        Ok(prk)
    }

    fn expand(&self, prk: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>, KeyScheduleError> {
        let mut okm = vec![0u8; length];
        let result = match self.hash {
            KdfHash::Sha256 => Hkdf::<Sha256>::from_prk(prk)
                .map_err(|e| KeyScheduleError::suite("expand", e))?
                .expand(info, &mut okm),
            KdfHash::Sha384 => Hkdf::<Sha384>::from_prk(prk)
                .map_err(|e| KeyScheduleError::suite("expand", e))?
                .expand(info, &mut okm),
            KdfHash::Sha512 => Hkdf::<Sha512>::from_prk(prk)
                .map_err(|e| KeyScheduleError::suite("expand", e))?
                .expand(info, &mut okm),
        };
        result.map_err(|e| KeyScheduleError::suite("expand", e))?;
        Ok(okm)
    }

    fn hash(&self, data: &[u8]) -> Result<Vec<u8>, KeyScheduleError> {
        let digest = match self.hash {
            KdfHash::Sha256 => Sha256::digest(data).to_vec(),
            KdfHash::Sha384 => Sha384::digest(data).to_vec(),
            KdfHash::Sha512 => Sha512::digest(data).to_vec(),
        };
        Ok(digest)
    }

    fn kem_export_sender(
        &self,
        public_key: &[u8],
        export_context: &[u8],
        length: usize,
    ) -> Result<(Vec<u8>, Vec<u8>), KeyScheduleError> {
        let (kem_output, exported) = self
            .crypto
            .hpke_setup_sender_and_export(
                self.ciphersuite.hpke_config(),
                public_key,
                &[],
                export_context,
                length,
            )
            .map_err(|e| KeyScheduleError::suite("kem_setup_sender", e))?;

        Ok((kem_output, exported.to_vec()))
    }

    fn kem_export_receiver(
        &self,
        kem_output: &[u8],
        key_pair: &KemKeyPair,
        export_context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KeyScheduleError> {
        let exported = self
            .crypto
            .hpke_setup_receiver_and_export(
                self.ciphersuite.hpke_config(),
                kem_output,
                key_pair.private_key(),
                &[],
                export_context,
                length,
            )
            .map_err(|e| KeyScheduleError::suite("kem_setup_receiver", e))?;

        Ok(exported.to_vec())
    }

    fn derive_key_pair(&self, seed: &[u8]) -> Result<KemKeyPair, KeyScheduleError> {
        let key_pair = self
            .crypto
            .derive_hpke_keypair(self.ciphersuite.hpke_config(), seed)
            .map_err(|e| KeyScheduleError::suite("derive_key_pair", e))?;

        Ok(KemKeyPair::new(key_pair.private.to_vec(), key_pair.public))
    }
}
