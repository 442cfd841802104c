//! Encryption key set: the secret tree built from an epoch's
//! `encryption_secret`.
//!
//! The encryption secret sits at the root of a left-balanced tree sized for
//! the group. Node secrets descend towards the leaves, and each leaf seeds two
//! hash ratchets (handshake and application) that hand out one AEAD key and
//! nonce per message.
//!
//! ```text
//! encryption_secret (root)
//!        │
//!        ▼
//! ExpandWithLabel(., "tree", "left" | "right", Nh) ... → leaf secret
//!        │
//!        ├─► ExpandWithLabel(., "handshake", "", Nh)   → handshake ratchet
//!        └─► ExpandWithLabel(., "application", "", Nh) → application ratchet
//! ```
//!
//! A leaf's ratchets are derived on first use and then owned by the key set.
//! Later lookups return the same ratchets, so a generation handed out once is
//! never handed out again for the lifetime of the key set.

pub mod ratchet;
pub mod tree;

use std::collections::{HashMap, hash_map::Entry};

pub use ratchet::{DEFAULT_MAX_FORWARD_SKIP, HashRatchet, KeyGeneration, RatchetConfig};
pub use tree::{LeafIndex, MAX_LEAVES, NodeIndex, TreeSize};

use crate::{error::KeySetError, secret::Secret, suite::CipherSuite};

/// Label for descending one level of the secret tree
const TREE_LABEL: &str = "tree";

/// Context for the left child
const LEFT_CONTEXT: &[u8] = b"left";

/// Context for the right child
const RIGHT_CONTEXT: &[u8] = b"right";

/// Label for a leaf's handshake ratchet secret
const HANDSHAKE_LABEL: &str = "handshake";

/// Label for a leaf's application ratchet secret
const APPLICATION_LABEL: &str = "application";

/// Handshake and application ratchets of one leaf
#[derive(Debug)]
pub struct LeafRatchets<S: CipherSuite> {
    /// Ratchet for handshake (commit, proposal) messages
    pub handshake: HashRatchet<S>,
    /// Ratchet for application messages
    pub application: HashRatchet<S>,
}

/// Root of the secret tree and the parameters every leaf derivation needs.
struct SecretTree<S: CipherSuite> {
    suite: S,
    tree_size: TreeSize,
    config: RatchetConfig,
    root_secret: Secret,
}

impl<S: CipherSuite + Clone> SecretTree<S> {
    fn leaf_secret(&self, leaf: LeafIndex) -> Result<Secret, KeySetError> {
        if !self.tree_size.contains(leaf) {
            return Err(KeySetError::LeafOutOfRange {
                leaf: leaf.0,
                leaf_count: self.tree_size.leaf_count(),
            });
        }

        let hash_length = self.suite.hash_length();
        let mut secret = self.root_secret.clone();
        for go_right in tree::direct_path_from_root(self.tree_size, leaf) {
            let context = if go_right { RIGHT_CONTEXT } else { LEFT_CONTEXT };
            secret = secret.expand_with_label(&self.suite, TREE_LABEL, context, hash_length)?;
        }

        Ok(secret)
    }

    fn leaf_ratchets(&self, leaf: LeafIndex) -> Result<LeafRatchets<S>, KeySetError> {
        let leaf_secret = self.leaf_secret(leaf)?;

        tracing::trace!(leaf = leaf.0, "deriving leaf ratchets");

        let handshake = leaf_secret.derive_secret(&self.suite, HANDSHAKE_LABEL)?;
        let application = leaf_secret.derive_secret(&self.suite, APPLICATION_LABEL)?;

        Ok(LeafRatchets {
            handshake: HashRatchet::new(self.suite.clone(), handshake, self.config),
            application: HashRatchet::new(self.suite.clone(), application, self.config),
        })
    }
}

/// Per-epoch message key store.
///
/// Owns one [`LeafRatchets`] per leaf that has sent or received a message.
/// Generations only move forward.
///
/// Two key sets are equal iff they were built for the same suite and tree
/// size from the same encryption secret. Ratchet progress is not compared.
pub struct GroupKeySet<S: CipherSuite + Clone> {
    tree: SecretTree<S>,

    /// Ratchet state per leaf (`leaf` -> ratchets), filled on first use.
    leaves: HashMap<LeafIndex, LeafRatchets<S>>,
}

impl<S: CipherSuite + Clone> GroupKeySet<S> {
    /// Build the key set for `tree_size` with default ratchet settings.
    pub fn new(suite: S, tree_size: TreeSize, encryption_secret: &Secret) -> Self {
        Self::with_config(suite, tree_size, encryption_secret, RatchetConfig::default())
    }

    /// Build the key set with explicit ratchet settings.
    pub fn with_config(
        suite: S,
        tree_size: TreeSize,
        encryption_secret: &Secret,
        config: RatchetConfig,
    ) -> Self {
        let tree =
            SecretTree { suite, tree_size, config, root_secret: encryption_secret.clone() };
        Self { tree, leaves: HashMap::new() }
    }

    /// Tree size this key set was built for.
    pub fn tree_size(&self) -> TreeSize {
        self.tree.tree_size
    }

    /// Ratchet configuration handed to every leaf ratchet.
    pub fn config(&self) -> RatchetConfig {
        self.tree.config
    }

    /// Ratchets of `leaf`.
    ///
    /// The first call for a leaf derives both ratchets at generation 0. Every
    /// later call returns the same ratchets with their progress intact.
    ///
    /// # Errors
    ///
    /// - `KeySetError::LeafOutOfRange` if `leaf` is outside the tree
    pub fn ratchets(&mut self, leaf: LeafIndex) -> Result<&mut LeafRatchets<S>, KeySetError> {
        match self.leaves.entry(leaf) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(self.tree.leaf_ratchets(leaf)?)),
        }
    }
}

impl<S: CipherSuite + Clone> PartialEq for GroupKeySet<S> {
    fn eq(&self, other: &Self) -> bool {
        self.tree.suite.suite_id() == other.tree.suite.suite_id()
            && self.tree.tree_size == other.tree.tree_size
            && self.tree.root_secret == other.tree.root_secret
    }
}

impl<S: CipherSuite + Clone> Eq for GroupKeySet<S> {}

impl<S: CipherSuite + Clone> std::fmt::Debug for GroupKeySet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupKeySet")
            .field("suite", &self.tree.suite.suite_id())
            .field("tree_size", &self.tree.tree_size)
            .field("active_leaves", &self.leaves.len())
            .finish_non_exhaustive()
    }
}
