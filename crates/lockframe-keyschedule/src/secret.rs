//! Secret values and the derivation algebra every schedule step is built from.
//!
//! ```text
//! Extract(salt, ikm)                    = KDF.Extract(salt, ikm)
//! Expand(secret, label, length)         = KDF.Expand(secret, label, length)
//! ExpandWithLabel(secret, label, ctx, L) = KDF.Expand(secret, KDFLabel, L)
//! DeriveSecret(secret, label)           = ExpandWithLabel(secret, label, "", Nh)
//! ```
//!
//! Every operation borrows its inputs and returns a freshly owned [`Secret`].

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{codec::KdfLabel, error::KeyScheduleError, suite::CipherSuite};

/// Immutable keyed byte value.
///
/// Zeroized on drop. Equality runs in constant time over the contents and is
/// meant for verification, not control flow. `Debug` never prints the bytes.
#[derive(Clone)]
pub struct Secret {
    value: Vec<u8>,
}

impl Secret {
    /// Wrap raw key material.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self { value: value.into() }
    }

    /// The all-zero secret of the suite's hash length.
    ///
    /// Identity input for "no commit secret" and "no PSK".
    pub fn zero<S: CipherSuite + ?Sized>(suite: &S) -> Self {
        Self { value: vec![0u8; suite.hash_length()] }
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True for a zero-length secret.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// `Extract(salt, ikm)`. Argument order matters: `salt` keys the HMAC.
    pub fn extract<S: CipherSuite + ?Sized>(
        suite: &S,
        salt: &Secret,
        ikm: &Secret,
    ) -> Result<Self, KeyScheduleError> {
        Ok(Self::new(suite.extract(&salt.value, &ikm.value)?))
    }

    /// Raw expansion with `label` as the info field.
    pub fn expand<S: CipherSuite + ?Sized>(
        &self,
        suite: &S,
        label: &str,
        length: usize,
    ) -> Result<Self, KeyScheduleError> {
        Ok(Self::new(suite.expand(&self.value, label.as_bytes(), length)?))
    }

    /// Expansion whose info field is the encoded `KDFLabel` of
    /// `(length, "MLS 1.0 " + label, context)`.
    pub fn expand_with_label<S: CipherSuite + ?Sized>(
        &self,
        suite: &S,
        label: &str,
        context: &[u8],
        length: usize,
    ) -> Result<Self, KeyScheduleError> {
        let info = KdfLabel::encode(label, context, length)?;
        Ok(Self::new(suite.expand(&self.value, &info, length)?))
    }

    /// `ExpandWithLabel(self, label, "", Nh)`.
    pub fn derive_secret<S: CipherSuite + ?Sized>(
        &self,
        suite: &S,
        label: &str,
    ) -> Result<Self, KeyScheduleError> {
        self.expand_with_label(suite, label, &[], suite.hash_length())
    }
}

impl PartialEq for Secret {
    /// Lengths are public and compared first; contents go through `subtle`.
    fn eq(&self, other: &Self) -> bool {
        self.value.len() == other.value.len()
            && bool::from(self.value.as_slice().ct_eq(other.value.as_slice()))
    }
}

impl Eq for Secret {}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED; {}])", self.value.len())
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use hkdf::Hkdf;
    use sha2::Sha256;

    use super::*;
    use crate::suite::RustCryptoSuite;

    #[test]
    fn zero_has_hash_length() {
        let suite = RustCryptoSuite::default();
        let zero = Secret::zero(&suite);
        assert_eq!(zero.len(), 32);
        assert!(zero.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn extract_is_order_sensitive() {
        let suite = RustCryptoSuite::default();
        let a = Secret::new(vec![1u8; 32]);
        let b = Secret::new(vec![2u8; 32]);

        let ab = Secret::extract(&suite, &a, &b).unwrap();
        let ba = Secret::extract(&suite, &b, &a).unwrap();

        assert_ne!(ab, ba, "salt and ikm must not be interchangeable");
    }

    #[test]
    fn extract_uses_first_argument_as_salt() {
        let suite = RustCryptoSuite::default();
        let salt = Secret::new(vec![1u8; 32]);
        let ikm = Secret::new(vec![2u8; 32]);

        let (expected, _) = Hkdf::<Sha256>::extract(Some(&[1u8; 32]), &[2u8; 32]);
        let derived = Secret::extract(&suite, &salt, &ikm).unwrap();

        assert_eq!(derived.as_bytes(), expected.as_slice());
    }

    #[test]
    fn expand_uses_raw_label_as_info() {
        let suite = RustCryptoSuite::default();
        let secret = Secret::new(vec![9u8; 32]);

        let hkdf = Hkdf::<Sha256>::from_prk(&[9u8; 32]).unwrap();
        let mut expected = [0u8; 16];
        hkdf.expand(b"key", &mut expected).unwrap();

        assert_eq!(secret.expand(&suite, "key", 16).unwrap().as_bytes(), &expected);
    }

    #[test]
    fn expand_with_label_matches_reference() {
        let suite = RustCryptoSuite::default();
        let secret = Secret::new(vec![0u8; 32]);

        let mut info = vec![0x00, 0x20, 12];
        info.extend_from_slice(b"MLS 1.0 init");
        info.push(0x00);
        let hkdf = Hkdf::<Sha256>::from_prk(&[0u8; 32]).unwrap();
        let mut expected = [0u8; 32];
        hkdf.expand(&info, &mut expected).unwrap();

        assert_eq!(secret.derive_secret(&suite, "init").unwrap().as_bytes(), &expected);
    }

    #[test]
    fn derive_secret_has_hash_length() {
        let suite = RustCryptoSuite::default();
        let secret = Secret::new(vec![5u8; 32]);
        assert_eq!(secret.derive_secret(&suite, "welcome").unwrap().len(), 32);
    }

    #[test]
    fn derivations_leave_source_untouched() {
        let suite = RustCryptoSuite::default();
        let secret = Secret::new(vec![5u8; 32]);
        let copy = secret.clone();

        let _derived = secret.derive_secret(&suite, "exporter").unwrap();
        let _expanded = secret.expand(&suite, "nonce", 12).unwrap();

        assert_eq!(secret, copy);
    }

    #[test]
    fn different_labels_produce_different_secrets() {
        let suite = RustCryptoSuite::default();
        let secret = Secret::new(vec![5u8; 32]);
        assert_ne!(
            secret.derive_secret(&suite, "init").unwrap(),
            secret.derive_secret(&suite, "external").unwrap()
        );
    }

    #[test]
    fn equality_requires_same_length() {
        assert_ne!(Secret::new(vec![0u8; 16]), Secret::new(vec![0u8; 32]));
        assert_eq!(Secret::new(vec![3u8; 16]), Secret::new(vec![3u8; 16]));
    }

    #[test]
    fn equality_sees_every_byte() {
        let base = Secret::new(vec![0x5Au8; 32]);

        for position in [0, 15, 31] {
            let mut bytes = vec![0x5Au8; 32];
            bytes[position] ^= 0x80;
            assert_ne!(base, Secret::new(bytes), "difference at byte {position}");
        }
        assert_eq!(base, Secret::new(vec![0x5Au8; 32]));
    }

    #[test]
    fn debug_redacts_contents() {
        let secret = Secret::new(vec![0xABu8; 4]);
        assert_eq!(format!("{secret:?}"), "Secret([REDACTED; 4])");
    }
}
