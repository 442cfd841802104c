//! Pre-shared key folding.
//!
//! ```text
//!              0                               0    = psk_secret_[0]
//!              |                               |
//!              V                               V
//! psk_[0] --> Extract --> ExpandWithLabel --> Extract = psk_secret_[1]
//!                                              |
//!              0                               |
//!              |                               |
//!              V                               V
//! psk_[1] --> Extract --> ExpandWithLabel --> Extract = psk_secret_[2]
//!                                             ...
//! ```
//!
//! Each step binds `(id, index, count)` into its label, so a prefix or a
//! permutation of the list folds to a different `psk_secret`.

use crate::{
    codec::{PreSharedKeyId, PskLabel},
    error::KeyScheduleError,
    secret::Secret,
    suite::CipherSuite,
};

/// Label for the per-PSK expansion
const DERIVED_PSK_LABEL: &str = "derived psk";

/// A resolved pre-shared key: its identifier and its secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskEntry {
    /// Identifier bound into the fold
    pub id: PreSharedKeyId,
    /// Resolved PSK value
    pub secret: Secret,
}

impl PskEntry {
    /// Pair an identifier with its resolved secret.
    pub fn new(id: PreSharedKeyId, secret: Secret) -> Self {
        Self { id, secret }
    }
}

/// Fold an ordered PSK list into a single `psk_secret`.
///
/// An empty list yields the all-zero secret. Fails with
/// [`KeyScheduleError::Encoding`] if the list is longer than `u16::MAX` or an
/// identifier cannot be encoded.
pub fn psk_secret<S: CipherSuite + ?Sized>(
    suite: &S,
    psks: &[PskEntry],
) -> Result<Secret, KeyScheduleError> {
    let mut acc = Secret::zero(suite);
    if psks.is_empty() {
        return Ok(acc);
    }

    let count = u16::try_from(psks.len()).map_err(|_| {
        KeyScheduleError::Encoding(format!("{} PSKs exceed the u16 count field", psks.len()))
    })?;

    tracing::trace!(count, "folding pre-shared keys");

    let zero = Secret::zero(suite);
    for (index, psk) in (0..count).zip(psks) {
        let label = PskLabel::encode(&psk.id, index, count)?;

        let extracted = Secret::extract(suite, &zero, &psk.secret)?;
        let input =
            extracted.expand_with_label(suite, DERIVED_PSK_LABEL, &label, suite.hash_length())?;
        acc = Secret::extract(suite, &input, &acc)?;
    }

    Ok(acc)
}
