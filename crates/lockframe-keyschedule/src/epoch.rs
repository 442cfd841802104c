//! Per-epoch secrets and the transition to the next epoch.
//!
//! ```text
//!                    epoch_secret
//!                         │
//!                         ├──► DeriveSecret(., "sender data")    = sender_data_secret
//!                         ├──► DeriveSecret(., "exporter")       = exporter_secret
//!                         ├──► DeriveSecret(., "confirm")        = confirmation_key
//!                         ├──► DeriveSecret(., "membership")     = membership_key
//!                         ├──► DeriveSecret(., "resumption")     = resumption_psk
//!                         ├──► DeriveSecret(., "authentication") = epoch_authenticator
//!                         ├──► DeriveSecret(., "external")       = external_secret ──► HPKE key pair
//!                         ├──► DeriveSecret(., "encryption")     = encryption_secret ──► key set
//!                         │
//!                         ▼
//!                   DeriveSecret(., "init") = init_secret ──► next epoch
//! ```
//!
//! # State Transitions
//!
//! The whole chain has a single transition rule, [`EpochKeys::next`]:
//! `init_secret` (or an external init secret) and a fresh commit secret feed
//! [`JoinSecrets::for_member`], whose completion is the next epoch. A group
//! starts from [`EpochKeys::for_creator`] and never terminates.
//!
//! An external join is the same transition with one input sourced
//! differently: the joiner encapsulates to this epoch's external public key
//! and the exported secret replaces `init_secret`.
//!
//! Epochs advance strictly one at a time per group. [`EpochKeys::advance`]
//! consumes the superseded epoch so its secrets are zeroized as soon as the
//! next one exists.

use rand::{CryptoRng, RngCore};

use crate::{
    error::KeyScheduleError,
    external::ExternalInitParams,
    join::{JoinSecrets, Open},
    key_set::{GroupKeySet, KeyGeneration, TreeSize},
    psk::PskEntry,
    secret::Secret,
    suite::{CipherSuite, EXTERNAL_INIT_EXPORT_LABEL, KemKeyPair},
};

const INIT_LABEL: &str = "init";
const SENDER_DATA_LABEL: &str = "sender data";
const EXPORTER_LABEL: &str = "exporter";
const CONFIRM_LABEL: &str = "confirm";
const MEMBERSHIP_LABEL: &str = "membership";
const RESUMPTION_LABEL: &str = "resumption";
const AUTHENTICATION_LABEL: &str = "authentication";
const EXTERNAL_LABEL: &str = "external";
const ENCRYPTION_LABEL: &str = "encryption";

/// Label for exporter outputs
const EXPORTED_LABEL: &str = "exported";

/// Labels for sender data key and nonce
const KEY_LABEL: &str = "key";
const NONCE_LABEL: &str = "nonce";

/// Immutable snapshot of one epoch's secrets.
///
/// Safe to share read-only across threads. Only the per-leaf ratchets of the
/// encryption key set advance, through [`EpochKeys::encryption_keys_mut`].
/// Every secret is zeroized when the snapshot is dropped.
pub struct EpochKeys<S: CipherSuite + Clone> {
    suite: S,
    tree_size: TreeSize,

    init_secret: Secret,
    sender_data_secret: Secret,
    exporter_secret: Secret,
    confirmation_key: Secret,
    membership_key: Secret,
    resumption_psk: Secret,
    epoch_authenticator: Secret,
    external_secret: Secret,
    encryption_secret: Secret,

    external_key_pair: KemKeyPair,
    key_set: GroupKeySet<S>,
}

impl<S: CipherSuite + Clone> EpochKeys<S> {
    /// Derive every secret of the epoch rooted at `epoch_secret`.
    ///
    /// Construction is atomic: either all secrets, the external key pair and
    /// the key set are derived, or an error is returned.
    ///
    /// Fails with [`KeyScheduleError::InvariantViolation`] if `epoch_secret`
    /// is not `Nh` bytes long.
    pub fn new(
        suite: S,
        tree_size: TreeSize,
        epoch_secret: &Secret,
    ) -> Result<Self, KeyScheduleError> {
        require_hash_length(&suite, epoch_secret, "epoch secret")?;

        let init_secret = epoch_secret.derive_secret(&suite, INIT_LABEL)?;
        let sender_data_secret = epoch_secret.derive_secret(&suite, SENDER_DATA_LABEL)?;
        let exporter_secret = epoch_secret.derive_secret(&suite, EXPORTER_LABEL)?;
        let confirmation_key = epoch_secret.derive_secret(&suite, CONFIRM_LABEL)?;
        let membership_key = epoch_secret.derive_secret(&suite, MEMBERSHIP_LABEL)?;
        let resumption_psk = epoch_secret.derive_secret(&suite, RESUMPTION_LABEL)?;
        let epoch_authenticator = epoch_secret.derive_secret(&suite, AUTHENTICATION_LABEL)?;
        let external_secret = epoch_secret.derive_secret(&suite, EXTERNAL_LABEL)?;
        let encryption_secret = epoch_secret.derive_secret(&suite, ENCRYPTION_LABEL)?;

        let external_key_pair = suite.derive_key_pair(external_secret.as_bytes())?;
        let key_set = GroupKeySet::new(suite.clone(), tree_size, &encryption_secret);

        tracing::debug!(
            suite = suite.suite_id(),
            leaves = tree_size.leaf_count(),
            "derived epoch keys"
        );

        Ok(Self {
            suite,
            tree_size,
            init_secret,
            sender_data_secret,
            exporter_secret,
            confirmation_key,
            membership_key,
            resumption_psk,
            epoch_authenticator,
            external_secret,
            encryption_secret,
            external_key_pair,
            key_set,
        })
    }

    /// First epoch of a new group with a random epoch secret and a one-leaf
    /// tree.
    pub fn for_creator<R: RngCore + CryptoRng>(
        suite: S,
        rng: &mut R,
    ) -> Result<Self, KeyScheduleError> {
        let mut bytes = vec![0u8; suite.hash_length()];
        rng.fill_bytes(&mut bytes);
        Self::for_creator_with_secret(suite, &Secret::new(bytes))
    }

    /// First epoch of a new group from a caller-chosen epoch secret.
    pub fn for_creator_with_secret(
        suite: S,
        epoch_secret: &Secret,
    ) -> Result<Self, KeyScheduleError> {
        Self::new(suite, TreeSize::for_leaves(1), epoch_secret)
    }

    /// Epoch entered through a Welcome carrying `joiner_secret`.
    pub fn for_joiner(
        suite: S,
        tree_size: TreeSize,
        joiner_secret: Secret,
        psks: &[PskEntry],
        context: &[u8],
    ) -> Result<Self, KeyScheduleError> {
        JoinSecrets::new(suite, joiner_secret, psks)?.complete(tree_size, context)
    }

    /// Epoch entered through an external commit.
    ///
    /// Identical to [`next`](Self::next) on the member side with the external
    /// init secret from `params`.
    pub fn for_external_joiner(
        suite: S,
        tree_size: TreeSize,
        params: &ExternalInitParams,
        commit_secret: &Secret,
        psks: &[PskEntry],
        context: &[u8],
    ) -> Result<Self, KeyScheduleError> {
        require_hash_length(&suite, params.init_secret(), "external init secret")?;

        tracing::debug!(
            suite = suite.suite_id(),
            leaves = tree_size.leaf_count(),
            psks = psks.len(),
            "joining via external init"
        );

        JoinSecrets::for_member(suite, params.init_secret(), commit_secret, psks, context)?
            .complete(tree_size, context)
    }

    /// Open join secrets for a commit from this epoch.
    ///
    /// Lets the committer read the welcome key and nonce, or inject a late
    /// PSK secret, before completing the next epoch.
    pub fn start_commit(
        &self,
        commit_secret: &Secret,
        psks: &[PskEntry],
        context: &[u8],
    ) -> Result<JoinSecrets<S, Open>, KeyScheduleError> {
        JoinSecrets::for_member(self.suite.clone(), &self.init_secret, commit_secret, psks, context)
    }

    /// Keys of the next epoch.
    ///
    /// Uses `external_init` in place of this epoch's `init_secret` when
    /// present. Fails with [`KeyScheduleError::InvariantViolation`] if the
    /// external init secret is not `Nh` bytes long.
    pub fn next(
        &self,
        tree_size: TreeSize,
        external_init: Option<&Secret>,
        commit_secret: &Secret,
        psks: &[PskEntry],
        context: &[u8],
    ) -> Result<Self, KeyScheduleError> {
        let init_secret = match external_init {
            Some(secret) => {
                require_hash_length(&self.suite, secret, "external init secret")?;
                secret
            },
            None => &self.init_secret,
        };

        tracing::debug!(
            suite = self.suite.suite_id(),
            leaves = tree_size.leaf_count(),
            psks = psks.len(),
            external = external_init.is_some(),
            "advancing epoch"
        );

        JoinSecrets::for_member(self.suite.clone(), init_secret, commit_secret, psks, context)?
            .complete(tree_size, context)
    }

    /// Like [`next`](Self::next), but consumes this epoch.
    ///
    /// The superseded epoch is dropped (and zeroized) once the next one
    /// exists. On error this epoch is dropped as well.
    pub fn advance(
        self,
        tree_size: TreeSize,
        external_init: Option<&Secret>,
        commit_secret: &Secret,
        psks: &[PskEntry],
        context: &[u8],
    ) -> Result<Self, KeyScheduleError> {
        self.next(tree_size, external_init, commit_secret, psks, context)
    }

    /// `Extract(confirmation_key, confirmed_transcript_hash)`.
    pub fn confirmation_tag(
        &self,
        confirmed_transcript_hash: &[u8],
    ) -> Result<Vec<u8>, KeyScheduleError> {
        self.suite.extract(self.confirmation_key.as_bytes(), confirmed_transcript_hash)
    }

    /// MLS exporter: `ExpandWithLabel(DeriveSecret(exporter_secret, label),
    /// "exported", Hash(context), length)`.
    pub fn exporter(
        &self,
        label: &str,
        context: &[u8],
        length: usize,
    ) -> Result<Secret, KeyScheduleError> {
        let context_hash = self.suite.hash(context)?;
        self.exporter_secret.derive_secret(&self.suite, label)?.expand_with_label(
            &self.suite,
            EXPORTED_LABEL,
            &context_hash,
            length,
        )
    }

    /// External init secret recovered from a joiner's `kem_output`.
    ///
    /// Existing members call this when processing an external commit, then
    /// pass the result to [`next`](Self::next).
    pub fn receive_external_init(&self, kem_output: &[u8]) -> Result<Secret, KeyScheduleError> {
        let exported = self.suite.kem_export_receiver(
            kem_output,
            &self.external_key_pair,
            EXTERNAL_INIT_EXPORT_LABEL,
            self.suite.hash_length(),
        )?;
        Ok(Secret::new(exported))
    }

    /// Cipher suite of this epoch.
    pub fn suite(&self) -> &S {
        &self.suite
    }

    /// Tree size this epoch was built for.
    pub fn tree_size(&self) -> TreeSize {
        self.tree_size
    }

    /// Carry-over secret seeding the next epoch.
    pub fn init_secret(&self) -> &Secret {
        &self.init_secret
    }

    /// Secret protecting sender data of encrypted messages.
    pub fn sender_data_secret(&self) -> &Secret {
        &self.sender_data_secret
    }

    /// Root of the MLS exporter.
    pub fn exporter_secret(&self) -> &Secret {
        &self.exporter_secret
    }

    /// MAC key for confirmation tags.
    pub fn confirmation_key(&self) -> &Secret {
        &self.confirmation_key
    }

    /// MAC key for membership tags.
    pub fn membership_key(&self) -> &Secret {
        &self.membership_key
    }

    /// Resumption PSK exported from this epoch.
    pub fn resumption_psk(&self) -> &Secret {
        &self.resumption_psk
    }

    /// Value members may compare out of band to confirm they share the epoch.
    pub fn epoch_authenticator(&self) -> &Secret {
        &self.epoch_authenticator
    }

    /// Seed of the external HPKE key pair.
    pub fn external_secret(&self) -> &Secret {
        &self.external_secret
    }

    /// Root of the secret tree.
    pub fn encryption_secret(&self) -> &Secret {
        &self.encryption_secret
    }

    /// External HPKE key pair derived from `external_secret`.
    pub fn external_key_pair(&self) -> &KemKeyPair {
        &self.external_key_pair
    }

    /// External public key to publish in `GroupInfo`.
    pub fn external_public_key(&self) -> &[u8] {
        self.external_key_pair.public_key()
    }

    /// Encryption key set for this epoch's tree size.
    pub fn encryption_keys(&self) -> &GroupKeySet<S> {
        &self.key_set
    }

    /// Mutable access to the key set, for sending and receiving messages.
    pub fn encryption_keys_mut(&mut self) -> &mut GroupKeySet<S> {
        &mut self.key_set
    }

    /// Encryption key set rebuilt for another tree size.
    ///
    /// The rebuilt set shares no ratchet state with [`Self::encryption_keys`];
    /// every leaf starts again at generation 0.
    pub fn encryption_keys_for(&self, tree_size: TreeSize) -> GroupKeySet<S> {
        GroupKeySet::with_config(
            self.suite.clone(),
            tree_size,
            &self.encryption_secret,
            self.key_set.config(),
        )
    }
}

/// Key and nonce protecting the sender data of one encrypted message.
///
/// `ExpandWithLabel(sender_data_secret, "key" | "nonce", sample, Nk | Nn)`,
/// where `sample` is the first `Nh` bytes of `ciphertext`, zero-padded when
/// the ciphertext is shorter.
pub fn sender_data_keys<S: CipherSuite + ?Sized>(
    suite: &S,
    sender_data_secret: &Secret,
    ciphertext: &[u8],
) -> Result<KeyGeneration, KeyScheduleError> {
    let sample_size = suite.hash_length();
    let mut sample = vec![0u8; sample_size];
    let copied = ciphertext.len().min(sample_size);
    sample[..copied].copy_from_slice(&ciphertext[..copied]);

    let key =
        sender_data_secret.expand_with_label(suite, KEY_LABEL, &sample, suite.aead_key_size())?;
    let nonce = sender_data_secret.expand_with_label(
        suite,
        NONCE_LABEL,
        &sample,
        suite.aead_nonce_size(),
    )?;

    Ok(KeyGeneration { generation: 0, key, nonce })
}

fn require_hash_length<S: CipherSuite + ?Sized>(
    suite: &S,
    secret: &Secret,
    what: &str,
) -> Result<(), KeyScheduleError> {
    if secret.len() == suite.hash_length() {
        Ok(())
    } else {
        Err(KeyScheduleError::InvariantViolation(format!(
            "{what} is {} bytes, suite hash length is {}",
            secret.len(),
            suite.hash_length()
        )))
    }
}

/// Equal iff suite, all secrets except the external key pair (which has no
/// canonical equality), and the key set match. For verification only.
impl<S: CipherSuite + Clone> PartialEq for EpochKeys<S> {
    fn eq(&self, other: &Self) -> bool {
        self.suite.suite_id() == other.suite.suite_id()
            && self.init_secret == other.init_secret
            && self.sender_data_secret == other.sender_data_secret
            && self.exporter_secret == other.exporter_secret
            && self.confirmation_key == other.confirmation_key
            && self.membership_key == other.membership_key
            && self.resumption_psk == other.resumption_psk
            && self.epoch_authenticator == other.epoch_authenticator
            && self.external_secret == other.external_secret
            && self.encryption_secret == other.encryption_secret
            && self.key_set == other.key_set
    }
}

impl<S: CipherSuite + Clone> Eq for EpochKeys<S> {}

impl<S: CipherSuite + Clone> std::fmt::Debug for EpochKeys<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochKeys")
            .field("suite", &self.suite.suite_id())
            .field("tree_size", &self.tree_size)
            .field("external_public_key", &self.external_key_pair.public_key())
            .finish_non_exhaustive()
    }
}
