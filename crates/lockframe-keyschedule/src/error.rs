//! Error types for the key schedule.
//!
//! Two layers: [`KeyScheduleError`] for the derivation engine itself (labels,
//! PSK folding, epoch construction) and [`KeySetError`] for the per-leaf
//! ratchets handed out by the encryption key set.
//!
//! Nothing here carries secret bytes. Derivations are deterministic, so none of
//! these errors is worth retrying with the same input.

use thiserror::Error;

/// Errors from key schedule derivations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyScheduleError {
    /// Canonical encoding of a label, context, or PSK identifier failed
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// The cipher suite rejected its input (bad public key, truncated KEM
    /// output, unsupported output length)
    #[error("cipher suite {operation} failed: {reason}")]
    Suite {
        /// Primitive that failed
        operation: &'static str,
        /// Description from the underlying provider
        reason: String,
    },

    /// A caller broke a structural contract, e.g. an epoch secret of the
    /// wrong length
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl KeyScheduleError {
    /// Returns true if this error is a programming-contract violation rather
    /// than a rejection of structurally invalid input.
    ///
    /// Contract violations indicate a bug in the caller and should fail fast.
    /// Encoding and suite errors are ordinary bad input.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }

    pub(crate) fn suite(operation: &'static str, reason: impl std::fmt::Debug) -> Self {
        Self::Suite { operation, reason: format!("{reason:?}") }
    }
}

/// Convert `tls_codec` errors to [`KeyScheduleError::Encoding`]
impl From<tls_codec::Error> for KeyScheduleError {
    fn from(err: tls_codec::Error) -> Self {
        Self::Encoding(format!("{err:?}"))
    }
}

/// Errors from the encryption key set and its hash ratchets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeySetError {
    /// Leaf index is outside the tree the key set was built for
    #[error("leaf {leaf} out of range for tree with {leaf_count} leaves")]
    LeafOutOfRange {
        /// Requested leaf
        leaf: u32,
        /// Leaves in the tree
        leaf_count: u32,
    },

    /// Requested generation was already consumed
    #[error("generation {requested} already consumed, ratchet at {current}")]
    GenerationTooOld {
        /// Current ratchet generation
        current: u32,
        /// Requested generation
        requested: u32,
    },

    /// Requested generation is further ahead than the configured skip window
    #[error("generation {requested} too far ahead of {current} (max skip {max_skip})")]
    GenerationTooFarAhead {
        /// Current ratchet generation
        current: u32,
        /// Requested generation
        requested: u32,
        /// Configured forward skip window
        max_skip: u32,
    },

    /// Ratchet generation would overflow
    #[error("ratchet generation overflow at {current}")]
    GenerationOverflow {
        /// Current generation when overflow was detected
        current: u32,
    },

    /// Underlying key schedule derivation failed
    #[error(transparent)]
    Schedule(#[from] KeyScheduleError),
}

impl KeySetError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Fatal errors indicate a protocol violation or bug. Generation errors
    /// are per-message and the ratchet remains usable.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::LeafOutOfRange { .. } | Self::GenerationOverflow { .. } => true,
            Self::Schedule(inner) => inner.is_contract_violation(),

            Self::GenerationTooOld { .. } | Self::GenerationTooFarAhead { .. } => false,
        }
    }
}
