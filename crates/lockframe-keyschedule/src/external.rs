//! Joiner side of the external init KEM.
//!
//! A non-member encapsulates to the group's published external public key.
//! The exported secret replaces `init_secret` for the transition into the
//! next epoch; the KEM output travels in the external commit so existing
//! members can recover the same secret with
//! [`EpochKeys::receive_external_init`](crate::EpochKeys::receive_external_init).

use crate::{
    error::KeyScheduleError,
    secret::Secret,
    suite::{CipherSuite, EXTERNAL_INIT_EXPORT_LABEL},
};

/// KEM output and exported init secret of an external join.
#[derive(Debug, Clone)]
pub struct ExternalInitParams {
    kem_output: Vec<u8>,
    init_secret: Secret,
}

impl ExternalInitParams {
    /// Encapsulate to `external_public_key` and export an `Nh`-byte init
    /// secret.
    ///
    /// Fails with [`KeyScheduleError::Suite`] if the public key is malformed.
    pub fn new<S: CipherSuite + ?Sized>(
        suite: &S,
        external_public_key: &[u8],
    ) -> Result<Self, KeyScheduleError> {
        let (kem_output, exported) = suite.kem_export_sender(
            external_public_key,
            EXTERNAL_INIT_EXPORT_LABEL,
            suite.hash_length(),
        )?;

        tracing::debug!(suite = suite.suite_id(), "encapsulated external init secret");

        Ok(Self { kem_output, init_secret: Secret::new(exported) })
    }

    /// KEM output to place in the external commit.
    pub fn kem_output(&self) -> &[u8] {
        &self.kem_output
    }

    /// Exported secret standing in for `init_secret`.
    pub fn init_secret(&self) -> &Secret {
        &self.init_secret
    }
}
