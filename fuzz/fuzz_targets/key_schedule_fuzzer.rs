//! Fuzz target for the epoch key schedule
//!
//! Drives epoch transitions, PSK folding and per-leaf ratchets with
//! adversarial inputs.
//!
//! # Strategy
//!
//! - Arbitrary epoch secrets (empty, short, exact, long)
//! - Arbitrary commit secrets, group contexts and PSK lists
//! - Tree sizes from 0 to `u16::MAX` leaves
//! - Random sequences of ratchet steps and out-of-order lookups
//!
//! # Invariants
//!
//! - Epoch secrets of the wrong length are rejected, never panic
//! - Transitions are deterministic
//! - Welcome and member paths agree on the next epoch
//! - Every key matches the one an independently built key set derives
//! - Consumed generations are never handed out again

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockframe_keyschedule::{
    EpochKeys, KeyScheduleError, LeafIndex, PreSharedKeyId, PskEntry, RustCryptoSuite, Secret,
    TreeSize, sender_data_keys,
};

#[derive(Debug, Clone, Arbitrary)]
struct KeyScheduleScenario {
    /// Creator epoch secret
    epoch_secret: EpochSecret,
    /// One commit per transition
    commits: Vec<Commit>,
    /// Ratchet operations on the final epoch
    operations: Vec<RatchetOperation>,
    /// Ciphertext sampled for sender data keys
    ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, Arbitrary)]
enum EpochSecret {
    Empty,
    Short([u8; 8]),
    Exact([u8; 32]),
    Long([u8; 64]),
    Arbitrary(Vec<u8>),
}

impl EpochSecret {
    fn as_bytes(&self) -> &[u8] {
        match self {
            EpochSecret::Empty => &[],
            EpochSecret::Short(b) => b,
            EpochSecret::Exact(b) => b,
            EpochSecret::Long(b) => b,
            EpochSecret::Arbitrary(b) => b,
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct Commit {
    commit_secret: [u8; 32],
    context: Vec<u8>,
    leaves: u16,
    /// (identifier, value) pairs, folded in order
    psks: Vec<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug, Clone, Arbitrary)]
enum RatchetOperation {
    /// Step a leaf's application ratchet once
    Next { leaf: u16 },
    /// Jump a leaf's application ratchet to a generation
    Get { leaf: u16, target: u16 },
}

fuzz_target!(|scenario: KeyScheduleScenario| {
    let suite = RustCryptoSuite::default();
    let epoch_secret = Secret::new(scenario.epoch_secret.as_bytes().to_vec());

    // INVARIANT 1: Only Nh-byte epoch secrets are accepted
    let mut epoch = match EpochKeys::for_creator_with_secret(suite.clone(), &epoch_secret) {
        Ok(epoch) => {
            assert_eq!(epoch_secret.len(), 32);
            epoch
        },
        Err(err) => {
            assert!(matches!(err, KeyScheduleError::InvariantViolation(_)));
            assert_ne!(epoch_secret.len(), 32);
            return;
        },
    };

    for commit in scenario.commits.iter().take(8) {
        let tree_size = TreeSize::for_leaves(u32::from(commit.leaves));
        let commit_secret = Secret::new(commit.commit_secret.to_vec());
        let psks: Vec<PskEntry> = commit
            .psks
            .iter()
            .take(4)
            .map(|(id, value)| {
                PskEntry::new(
                    PreSharedKeyId::external(id.clone(), Vec::new()),
                    Secret::new(value.clone()),
                )
            })
            .collect();

        // INVARIANT 2: Transitions are deterministic
        let next = epoch.next(tree_size, None, &commit_secret, &psks, &commit.context).unwrap();
        let again = epoch.next(tree_size, None, &commit_secret, &psks, &commit.context).unwrap();
        assert_eq!(next, again, "transition must be deterministic");
        assert_ne!(next, epoch, "transition must change the epoch");

        // INVARIANT 3: A joiner reaches the committer's epoch
        let join = epoch.start_commit(&commit_secret, &psks, &commit.context).unwrap();
        let joiner = EpochKeys::for_joiner(
            suite.clone(),
            tree_size,
            join.joiner_secret().clone(),
            &psks,
            &commit.context,
        )
        .unwrap();
        assert_eq!(joiner, next, "welcome path must match member path");

        epoch = next;
    }

    let sender_data =
        sender_data_keys(&suite, epoch.sender_data_secret(), &scenario.ciphertext).unwrap();
    assert_eq!(sender_data.key.len(), 16);
    assert_eq!(sender_data.nonce.len(), 12);

    // Receiver-side key set built independently from the same epoch
    let mut reference = epoch.encryption_keys_for(epoch.tree_size());
    let keys = epoch.encryption_keys_mut();
    for op in scenario.operations.iter().take(64) {
        match *op {
            RatchetOperation::Next { leaf } => {
                let leaf = LeafIndex(u32::from(leaf));
                let Ok(ratchets) = keys.ratchets(leaf) else {
                    assert!(!keys.tree_size().contains(leaf));
                    continue;
                };

                let before = ratchets.application.generation();
                let key = ratchets.application.next().unwrap();
                assert_eq!(key.generation, before);
                assert_eq!(ratchets.application.generation(), before + 1);

                // INVARIANT 4: An independent key set derives the same key
                let expected = reference.ratchets(leaf).unwrap().application.get(before).unwrap();
                assert_eq!(key, expected);
            },

            RatchetOperation::Get { leaf, target } => {
                let leaf = LeafIndex(u32::from(leaf));
                let Ok(ratchets) = keys.ratchets(leaf) else {
                    assert!(!keys.tree_size().contains(leaf));
                    continue;
                };

                let before = ratchets.application.generation();
                let target = u32::from(target) % 1024;
                match ratchets.application.get(target) {
                    Ok(key) => {
                        assert_eq!(key.generation, target);
                        let expected =
                            reference.ratchets(leaf).unwrap().application.get(target).unwrap();
                        assert_eq!(key, expected);

                        // INVARIANT 5: Consumed generations stay consumed
                        let again = keys.ratchets(leaf).unwrap();
                        assert!(again.application.get(target).is_err());
                    },
                    Err(err) => {
                        let max_skip = keys.config().max_forward_skip;
                        assert!(
                            target < before || target - before > max_skip,
                            "unexpected error: {err}"
                        );
                    },
                }
            },
        }
    }
});
