//! Lockframe Key Schedule
//!
//! The per-epoch key schedule of an MLS group. Pure functions with
//! deterministic outputs: given the current epoch and this epoch's inputs, it
//! derives every secret the group needs and the seed of the next epoch.
//! Callers provide randomness where it is needed (creator epoch secrets).
//!
//! # Key Lifecycle
//!
//! Each commit contributes a fresh commit secret. Combined with the previous
//! epoch's `init_secret` and any pre-shared keys, it yields a new epoch
//! secret, from which all of the epoch's secrets are derived by
//! domain-separated expansion.
//!
//! ```text
//! init_secret_[n-1] ──► Extract(., commit_secret) ──► "joiner" ──► joiner_secret
//!                                                                   │
//!                                        psk_secret ──► Extract ◄──┘
//!                                                          │
//!                                                   member_secret ──► welcome_secret
//!                                                          │
//!                                                       "epoch"
//!                                                          │
//!                                                          ▼
//!                                                    epoch_secret
//!                                                          │
//!        ┌────────────┬─────────────┬───────────┬──────────┼──────────┬───────────┐
//!        ▼            ▼             ▼           ▼          ▼          ▼           ▼
//!   sender data   exporter   confirm/member  resumption  external  encryption    init
//!                                                           │          │           │
//!                                                      HPKE keys   secret tree     ▼
//!                                                                            next epoch
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - Only `init_secret` crosses an epoch boundary; [`EpochKeys::advance`]
//!   drops the superseded epoch and every [`Secret`] zeroizes on drop
//! - Per-leaf hash ratchets replace their chain secret on every message, and
//!   [`GroupKeySet`] keeps each leaf's ratchets so a used generation is never
//!   derived again
//!
//! Domain Separation:
//! - Every derived secret uses its own fixed label under the `"MLS 1.0 "`
//!   prefix; no two secrets of an epoch share a label
//!
//! PSK Binding:
//! - Each folding step binds the PSK identifier, its index, and the list
//!   length, so truncated or reordered PSK lists reach a different secret
//!
//! Post-Compromise Security:
//! - A commit secret unknown to the attacker makes every later epoch secret
//!   unknown to them as well

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod epoch;
pub mod error;
pub mod external;
pub mod join;
pub mod key_set;
pub mod psk;
pub mod secret;
pub mod suite;

pub use codec::{PreSharedKeyId, Psk, ResumptionPskUsage};
pub use epoch::{EpochKeys, sender_data_keys};
pub use error::{KeyScheduleError, KeySetError};
pub use external::ExternalInitParams;
pub use join::{JoinSecrets, Open, Sealed, WelcomeSecrets, welcome_secret};
pub use key_set::{
    GroupKeySet, HashRatchet, KeyGeneration, LeafIndex, LeafRatchets, MAX_LEAVES, RatchetConfig,
    TreeSize,
};
pub use psk::{PskEntry, psk_secret};
pub use secret::Secret;
pub use suite::{CipherSuite, KemKeyPair, RustCryptoSuite};
