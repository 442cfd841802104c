//! Canonical TLS presentation encoding of derivation labels.
//!
//! ```text
//! struct {
//!     uint16 length;
//!     opaque label<V>;        // "MLS 1.0 " + Label
//!     opaque context<V>;
//! } KDFLabel;
//!
//! struct {
//!     PreSharedKeyID id;
//!     uint16 index;
//!     uint16 count;
//! } PSKLabel;
//! ```

use std::io::Write;

use tls_codec::{Serialize, Size, TlsSerialize, TlsSize, VLBytes};

use crate::{error::KeyScheduleError, suite::LABEL_PREFIX};

/// Info field of `ExpandWithLabel`
#[derive(Debug, Clone, PartialEq, Eq, TlsSerialize, TlsSize)]
pub(crate) struct KdfLabel {
    length: u16,
    label: VLBytes,
    context: VLBytes,
}

impl KdfLabel {
    /// Encode the label for an output of `length` bytes.
    ///
    /// Fails with [`KeyScheduleError::Encoding`] if `length` exceeds
    /// `u16::MAX` or `context` exceeds the variable-length vector limit.
    pub(crate) fn encode(
        label: &str,
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KeyScheduleError> {
        let length = u16::try_from(length).map_err(|_| {
            KeyScheduleError::Encoding(format!("KDF output length {length} exceeds u16"))
        })?;

        let mut full_label = Vec::with_capacity(LABEL_PREFIX.len() + label.len());
        full_label.extend_from_slice(LABEL_PREFIX.as_bytes());
        full_label.extend_from_slice(label.as_bytes());

        let kdf_label = Self {
            length,
            label: VLBytes::new(full_label),
            context: VLBytes::new(context.to_vec()),
        };
        Ok(kdf_label.tls_serialize_detached()?)
    }
}

/// Purpose a resumption PSK was exported for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResumptionPskUsage {
    /// Resumption within the same group
    Application = 1,
    /// Reinitialization of the group
    Reinit = 2,
    /// Branching into a subgroup
    Branch = 3,
}

/// Which kind of pre-shared key an identifier refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Psk {
    /// PSK provisioned out of band, named by an application identifier
    External {
        /// Application-chosen PSK identifier
        psk_id: Vec<u8>,
    },
    /// Resumption secret of an earlier epoch
    Resumption {
        /// Why the PSK is being used
        usage: ResumptionPskUsage,
        /// Group the resumption secret came from
        group_id: Vec<u8>,
        /// Epoch the resumption secret came from
        epoch: u64,
    },
}

impl Psk {
    const EXTERNAL: u8 = 1;
    const RESUMPTION: u8 = 2;
}

/// Identifier of a pre-shared key together with its per-use nonce.
///
/// Owned by the caller. The schedule only borrows it to build PSK labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreSharedKeyId {
    /// The PSK this identifier names
    pub psk: Psk,
    /// Fresh nonce chosen by the committer
    pub psk_nonce: Vec<u8>,
}

impl PreSharedKeyId {
    /// Identifier for an external PSK.
    pub fn external(psk_id: impl Into<Vec<u8>>, psk_nonce: impl Into<Vec<u8>>) -> Self {
        Self { psk: Psk::External { psk_id: psk_id.into() }, psk_nonce: psk_nonce.into() }
    }

    /// Identifier for a resumption PSK from `group_id` at `epoch`.
    pub fn resumption(
        usage: ResumptionPskUsage,
        group_id: impl Into<Vec<u8>>,
        epoch: u64,
        psk_nonce: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            psk: Psk::Resumption { usage, group_id: group_id.into(), epoch },
            psk_nonce: psk_nonce.into(),
        }
    }

    /// Canonical encoding of this identifier.
    pub fn encode(&self) -> Result<Vec<u8>, KeyScheduleError> {
        Ok(self.tls_serialize_detached()?)
    }
}

impl Size for PreSharedKeyId {
    fn tls_serialized_len(&self) -> usize {
        let body = match &self.psk {
            Psk::External { psk_id } => vl_len(psk_id),
            Psk::Resumption { group_id, .. } => 1 + vl_len(group_id) + 8,
        };
        1 + body + vl_len(&self.psk_nonce)
    }
}

impl Serialize for PreSharedKeyId {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        let mut written = match &self.psk {
            Psk::External { psk_id } => {
                Psk::EXTERNAL.tls_serialize(writer)? + write_vl(psk_id, writer)?
            },
            Psk::Resumption { usage, group_id, epoch } => {
                Psk::RESUMPTION.tls_serialize(writer)?
                    + (*usage as u8).tls_serialize(writer)?
                    + write_vl(group_id, writer)?
                    + epoch.tls_serialize(writer)?
            },
        };
        written += write_vl(&self.psk_nonce, writer)?;
        Ok(written)
    }
}

/// Label bound into every step of PSK folding
#[derive(Debug, TlsSerialize, TlsSize)]
pub(crate) struct PskLabel {
    id: PreSharedKeyId,
    index: u16,
    count: u16,
}

impl PskLabel {
    pub(crate) fn encode(
        id: &PreSharedKeyId,
        index: u16,
        count: u16,
    ) -> Result<Vec<u8>, KeyScheduleError> {
        Ok(Self { id: id.clone(), index, count }.tls_serialize_detached()?)
    }
}

fn vl_len(bytes: &[u8]) -> usize {
    VLBytes::new(bytes.to_vec()).tls_serialized_len()
}

fn write_vl<W: Write>(bytes: &[u8], writer: &mut W) -> Result<usize, tls_codec::Error> {
    VLBytes::new(bytes.to_vec()).tls_serialize(writer)
}
