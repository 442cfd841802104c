//! Epoch chain scenarios
//!
//! Drives the schedule the way the group layer does: create, commit, join via
//! Welcome, join via external commit. Checks that every path agrees on the
//! resulting epoch and that known-answer vectors hold.

use hkdf::Hkdf;
use lockframe_keyschedule::{
    EpochKeys, ExternalInitParams, JoinSecrets, LeafIndex, PreSharedKeyId, PskEntry,
    ResumptionPskUsage, RustCryptoSuite, Secret, TreeSize, psk_secret, welcome_secret,
};
use sha2::Sha256;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn suite() -> RustCryptoSuite {
    RustCryptoSuite::default()
}

fn creator_epoch() -> EpochKeys<RustCryptoSuite> {
    EpochKeys::for_creator_with_secret(suite(), &Secret::new(vec![0x5Au8; 32])).unwrap()
}

fn external_psk(name: &[u8], value: u8) -> PskEntry {
    PskEntry::new(
        PreSharedKeyId::external(name.to_vec(), vec![0u8; 32]),
        Secret::new(vec![value; 32]),
    )
}

#[test]
fn init_secret_matches_reference_vector() {
    init_tracing();
    let epoch =
        EpochKeys::new(suite(), TreeSize::for_leaves(1), &Secret::new(vec![0u8; 32])).unwrap();

    let expected =
        hex::decode("62f3a902389dfd0bb35c16ea5da1edacde4918170206e5ed82cfce069505c33b").unwrap();
    assert_eq!(epoch.init_secret().as_bytes(), expected.as_slice());
}

#[test]
fn init_secret_matches_independent_hkdf() {
    let epoch =
        EpochKeys::new(suite(), TreeSize::for_leaves(1), &Secret::new(vec![0u8; 32])).unwrap();

    // KDFLabel { length: 32, label: "MLS 1.0 init", context: "" }
    let mut info = vec![0x00, 0x20, 0x0C];
    info.extend_from_slice(b"MLS 1.0 init");
    info.push(0x00);

    let hkdf = Hkdf::<Sha256>::from_prk(&[0u8; 32]).unwrap();
    let mut expected = [0u8; 32];
    hkdf.expand(&info, &mut expected).unwrap();

    assert_eq!(epoch.init_secret().as_bytes(), &expected);
}

#[test]
fn welcome_secrets_match_reference_vector() {
    let secrets = JoinSecrets::new(suite(), Secret::new(vec![0x11u8; 32]), &[]).unwrap();

    assert_eq!(
        hex::encode(secrets.welcome_secret().as_bytes()),
        "2a8d688061a86463b37e9db113ae7272b581a4293a8b6a6d561269df9946c198"
    );
    assert_eq!(hex::encode(secrets.welcome_key().as_bytes()), "6b2ff40baa9eaf29cd501b6670506e5e");
}

#[test]
fn ratchet_chain_is_reproducible() {
    init_tracing();
    let size = TreeSize::for_leaves(3);
    let commit1 = Secret::new(vec![1u8; 32]);
    let commit2 = Secret::new(vec![2u8; 32]);

    let run = || {
        creator_epoch()
            .next(size, None, &commit1, &[], b"context-1")
            .unwrap()
            .next(size, None, &commit2, &[], b"context-2")
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.tree_size(), size);
}

#[test]
fn advance_chain_matches_borrowing_chain() {
    let size = TreeSize::for_leaves(2);
    let commits: Vec<Secret> = (1u8..=5).map(|i| Secret::new(vec![i; 32])).collect();

    let mut borrowed = creator_epoch();
    for commit in &commits {
        borrowed = borrowed.next(size, None, commit, &[], b"ctx").unwrap();
    }

    let mut consumed = creator_epoch();
    for commit in &commits {
        consumed = consumed.advance(size, None, commit, &[], b"ctx").unwrap();
    }

    assert_eq!(borrowed, consumed);
}

#[test]
fn every_epoch_in_chain_is_distinct() {
    let size = TreeSize::for_leaves(2);
    let zero = Secret::zero(&suite());

    let mut epochs = vec![creator_epoch()];
    for _ in 0..4 {
        let next = epochs.last().unwrap().next(size, None, &zero, &[], b"ctx").unwrap();
        epochs.push(next);
    }

    for i in 0..epochs.len() {
        for j in (i + 1)..epochs.len() {
            assert_ne!(epochs[i], epochs[j], "epochs {i} and {j} must differ");
        }
    }
}

#[test]
fn welcome_joiner_reaches_committer_epoch() {
    let current = creator_epoch();
    let size = TreeSize::for_leaves(2);
    let commit = Secret::new(vec![0xC0u8; 32]);
    let psks = [external_psk(b"shared", 9)];

    let join = current.start_commit(&commit, &psks, b"ctx").unwrap();
    let joiner_secret = join.joiner_secret().clone();
    let committer = join.complete(size, b"ctx").unwrap();

    let joiner = EpochKeys::for_joiner(suite(), size, joiner_secret, &psks, b"ctx").unwrap();

    assert_eq!(committer, joiner);
}

#[test]
fn welcome_values_independent_of_context() {
    let joiner_secret = Secret::new(vec![0x33u8; 32]);
    let psks = [external_psk(b"a", 1), external_psk(b"b", 2)];

    let standalone = welcome_secret(&suite(), &joiner_secret, &psks).unwrap();
    let full = JoinSecrets::new(suite(), joiner_secret.clone(), &psks).unwrap();

    assert_eq!(&standalone, full.welcome_secret());

    let sealed_a = JoinSecrets::new(suite(), joiner_secret.clone(), &psks)
        .unwrap()
        .seal(b"context a")
        .unwrap();
    let sealed_b =
        JoinSecrets::new(suite(), joiner_secret, &psks).unwrap().seal(b"context b").unwrap();

    assert_eq!(sealed_a.welcome(), sealed_b.welcome());
    assert_ne!(sealed_a.epoch_secret(), sealed_b.epoch_secret());
}

#[test]
fn empty_psk_list_equals_explicit_zero() {
    let joiner_secret = Secret::new(vec![0x44u8; 32]);
    let zero = Secret::zero(&suite());

    assert_eq!(psk_secret(&suite(), &[]).unwrap(), zero);

    let size = TreeSize::for_leaves(1);
    let from_list = JoinSecrets::new(suite(), joiner_secret.clone(), &[]).unwrap();
    let from_zero = JoinSecrets::with_psk_secret(suite(), joiner_secret, &zero).unwrap();

    assert_eq!(from_list.welcome(), from_zero.welcome());
    assert_eq!(
        from_list.complete(size, b"ctx").unwrap(),
        from_zero.complete(size, b"ctx").unwrap()
    );
}

#[test]
fn late_psk_injection_matches_known_psks() {
    let current = creator_epoch();
    let size = TreeSize::for_leaves(2);
    let commit = Secret::new(vec![0xC1u8; 32]);
    let psks = [PskEntry::new(
        PreSharedKeyId::resumption(
            ResumptionPskUsage::Application,
            b"group".to_vec(),
            0,
            vec![1u8; 32],
        ),
        current.resumption_psk().clone(),
    )];

    let mut late = current.start_commit(&commit, &[], b"ctx").unwrap();
    late.inject_psk_secret(&psk_secret(&suite(), &psks).unwrap()).unwrap();
    let late = late.complete(size, b"ctx").unwrap();

    let known = current.next(size, None, &commit, &psks, b"ctx").unwrap();
    assert_eq!(late, known);
}

#[test]
fn external_join_matches_member_path() {
    init_tracing();
    let current = creator_epoch();
    let size = TreeSize::for_leaves(2);
    let commit = Secret::new(vec![0xE0u8; 32]);
    let psks = [external_psk(b"ext", 4)];

    let params = ExternalInitParams::new(current.suite(), current.external_public_key()).unwrap();
    let joiner =
        EpochKeys::for_external_joiner(suite(), size, &params, &commit, &psks, b"ctx").unwrap();

    let received = current.receive_external_init(params.kem_output()).unwrap();
    let member = current.next(size, Some(&received), &commit, &psks, b"ctx").unwrap();

    assert_eq!(joiner, member);
    assert_ne!(member, current.next(size, None, &commit, &psks, b"ctx").unwrap());
}

#[test]
fn external_init_with_foreign_kem_output_diverges() {
    let current = creator_epoch();
    let other =
        EpochKeys::for_creator_with_secret(suite(), &Secret::new(vec![0x77u8; 32])).unwrap();

    let params = ExternalInitParams::new(other.suite(), other.external_public_key()).unwrap();
    let received = current.receive_external_init(params.kem_output()).unwrap();

    assert_ne!(&received, params.init_secret());
}

#[test]
fn malformed_kem_output_is_suite_error() {
    let current = creator_epoch();
    let result = current.receive_external_init(&[0x01, 0x02]);
    assert!(matches!(result, Err(lockframe_keyschedule::KeyScheduleError::Suite { .. })));
}

#[test]
fn members_derive_same_message_keys() {
    let size = TreeSize::for_leaves(4);
    let commit = Secret::new(vec![0xAAu8; 32]);
    let mut committer = creator_epoch().next(size, None, &commit, &[], b"ctx").unwrap();
    let mut receiver = creator_epoch().next(size, None, &commit, &[], b"ctx").unwrap();

    let sender_ratchets = committer.encryption_keys_mut().ratchets(LeafIndex(2)).unwrap();
    let sent: Vec<_> = (0..3).map(|_| sender_ratchets.application.next().unwrap()).collect();

    let receiver_ratchets = receiver.encryption_keys_mut().ratchets(LeafIndex(2)).unwrap();
    let out_of_order = receiver_ratchets.application.get(2).unwrap();
    assert_eq!(sent[2], out_of_order);

    let receiver_ratchets = receiver.encryption_keys_mut().ratchets(LeafIndex(2)).unwrap();
    assert!(receiver_ratchets.application.get(0).is_err(), "skipped keys are gone");

    let sender_ratchets = committer.encryption_keys_mut().ratchets(LeafIndex(2)).unwrap();
    assert_eq!(sender_ratchets.application.generation(), 3);
}

#[test]
fn exporter_agrees_across_members() {
    let size = TreeSize::for_leaves(2);
    let commit = Secret::new(vec![0xABu8; 32]);
    let a = creator_epoch().next(size, None, &commit, &[], b"ctx").unwrap();
    let b = creator_epoch().next(size, None, &commit, &[], b"ctx").unwrap();

    assert_eq!(
        a.exporter("lockframe sender keys", b"room", 32).unwrap(),
        b.exporter("lockframe sender keys", b"room", 32).unwrap()
    );
}
