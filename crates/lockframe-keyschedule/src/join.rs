//! Joiner secret, PSK mixing, and the welcome secrets.
//!
//! ```text
//!                  init_secret_[n-1]
//!                        │
//!                        ▼
//! commit_secret ──► KDF.Extract
//!                        │
//!                        ▼
//!      ExpandWithLabel(., "joiner", GroupContext_[n], Nh)
//!                        │
//!                        ▼
//!                  joiner_secret
//!                        │
//!                        ▼
//! psk_secret (or 0) ─► KDF.Extract = member_secret
//!                        │
//!                        ├──► DeriveSecret(., "welcome") = welcome_secret
//!                        │
//!                        ▼
//!      ExpandWithLabel(., "epoch", GroupContext_[n], Nh)
//!                        │
//!                        ▼
//!                  epoch_secret
//! ```
//!
//! [`JoinSecrets`] is typed by its state. An [`Open`] instance still accepts
//! a late PSK secret through [`JoinSecrets::inject_psk_secret`]; sealing it
//! fixes the epoch secret and removes that ability, so a sealed instance can
//! never be mistaken for one still accepting input.

use crate::{
    epoch::EpochKeys,
    error::KeyScheduleError,
    key_set::TreeSize,
    psk::{PskEntry, psk_secret},
    secret::Secret,
    suite::CipherSuite,
};

/// Label for the joiner secret
const JOINER_LABEL: &str = "joiner";

/// Label for the welcome secret
const WELCOME_LABEL: &str = "welcome";

/// Label for the epoch secret
const EPOCH_LABEL: &str = "epoch";

/// Label for the welcome AEAD key
const KEY_LABEL: &str = "key";

/// Label for the welcome AEAD nonce
const NONCE_LABEL: &str = "nonce";

/// State of a [`JoinSecrets`] that still accepts PSK injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Open;

/// State of a [`JoinSecrets`] whose epoch secret is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    epoch_secret: Secret,
}

/// Welcome secret with the AEAD key and nonce protecting the Welcome message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeSecrets {
    /// `DeriveSecret(member_secret, "welcome")`
    pub secret: Secret,
    /// `Expand(welcome_secret, "key", Nk)`
    pub key: Secret,
    /// `Expand(welcome_secret, "nonce", Nn)`
    pub nonce: Secret,
}

impl WelcomeSecrets {
    fn derive<S: CipherSuite + ?Sized>(
        suite: &S,
        member_secret: &Secret,
    ) -> Result<Self, KeyScheduleError> {
        let secret = member_secret.derive_secret(suite, WELCOME_LABEL)?;
        let key = secret.expand(suite, KEY_LABEL, suite.aead_key_size())?;
        let nonce = secret.expand(suite, NONCE_LABEL, suite.aead_nonce_size())?;
        Ok(Self { secret, key, nonce })
    }
}

/// Secrets linking a joiner secret to the epoch it produces.
///
/// Constructed once per commit or join, and consumed by exactly one
/// [`complete`](JoinSecrets::complete) call.
#[derive(Debug)]
pub struct JoinSecrets<S: CipherSuite + Clone, State = Open> {
    suite: S,
    joiner_secret: Secret,
    member_secret: Secret,
    welcome: WelcomeSecrets,
    state: State,
}

impl<S: CipherSuite + Clone> JoinSecrets<S, Open> {
    /// Join secrets for a member processing a commit.
    ///
    /// `joiner_secret = ExpandWithLabel(Extract(init_secret, commit_secret),
    /// "joiner", context, Nh)`, then mixed with the folded `psks`.
    pub fn for_member(
        suite: S,
        init_secret: &Secret,
        commit_secret: &Secret,
        psks: &[PskEntry],
        context: &[u8],
    ) -> Result<Self, KeyScheduleError> {
        let pre_joiner = Secret::extract(&suite, init_secret, commit_secret)?;
        let joiner_secret =
            pre_joiner.expand_with_label(&suite, JOINER_LABEL, context, suite.hash_length())?;
        Self::new(suite, joiner_secret, psks)
    }

    /// Join secrets from a known joiner secret and a PSK list.
    pub fn new(
        suite: S,
        joiner_secret: Secret,
        psks: &[PskEntry],
    ) -> Result<Self, KeyScheduleError> {
        let psk_secret = psk_secret(&suite, psks)?;
        Self::with_psk_secret(suite, joiner_secret, &psk_secret)
    }

    /// Join secrets from a known joiner secret and an already folded
    /// `psk_secret`.
    pub fn with_psk_secret(
        suite: S,
        joiner_secret: Secret,
        psk_secret: &Secret,
    ) -> Result<Self, KeyScheduleError> {
        let member_secret = Secret::extract(&suite, &joiner_secret, psk_secret)?;
        let welcome = WelcomeSecrets::derive(&suite, &member_secret)?;
        Ok(Self { suite, joiner_secret, member_secret, welcome, state: Open })
    }

    /// Replace the PSK contribution with a `psk_secret` that only became
    /// known after construction.
    ///
    /// Recomputes the member secret and all welcome secrets. The joiner secret
    /// is untouched. On error the instance is left unchanged.
    pub fn inject_psk_secret(&mut self, psk_secret: &Secret) -> Result<(), KeyScheduleError> {
        let member_secret = Secret::extract(&self.suite, &self.joiner_secret, psk_secret)?;
        let welcome = WelcomeSecrets::derive(&self.suite, &member_secret)?;

        tracing::trace!(suite = self.suite.suite_id(), "injected PSK secret into join secrets");

        self.member_secret = member_secret;
        self.welcome = welcome;
        Ok(())
    }

    /// Fix the epoch secret for `context`, ending PSK injection.
    pub fn seal(self, context: &[u8]) -> Result<JoinSecrets<S, Sealed>, KeyScheduleError> {
        let epoch_secret = self.member_secret.expand_with_label(
            &self.suite,
            EPOCH_LABEL,
            context,
            self.suite.hash_length(),
        )?;

        Ok(JoinSecrets {
            suite: self.suite,
            joiner_secret: self.joiner_secret,
            member_secret: self.member_secret,
            welcome: self.welcome,
            state: Sealed { epoch_secret },
        })
    }

    /// Derive the epoch secret for `context` and build that epoch's keys.
    pub fn complete(
        self,
        tree_size: TreeSize,
        context: &[u8],
    ) -> Result<EpochKeys<S>, KeyScheduleError> {
        self.seal(context)?.complete(tree_size)
    }
}

impl<S: CipherSuite + Clone> JoinSecrets<S, Sealed> {
    /// The epoch secret fixed at sealing.
    pub fn epoch_secret(&self) -> &Secret {
        &self.state.epoch_secret
    }

    /// Build the epoch's keys.
    pub fn complete(self, tree_size: TreeSize) -> Result<EpochKeys<S>, KeyScheduleError> {
        EpochKeys::new(self.suite, tree_size, &self.state.epoch_secret)
    }
}

impl<S: CipherSuite + Clone, State> JoinSecrets<S, State> {
    /// The joiner secret, carried in the Welcome message.
    pub fn joiner_secret(&self) -> &Secret {
        &self.joiner_secret
    }

    /// `Extract(joiner_secret, psk_secret)`.
    pub fn member_secret(&self) -> &Secret {
        &self.member_secret
    }

    /// Welcome secret, key, and nonce.
    pub fn welcome(&self) -> &WelcomeSecrets {
        &self.welcome
    }

    /// Shorthand for `welcome().secret`.
    pub fn welcome_secret(&self) -> &Secret {
        &self.welcome.secret
    }

    /// Shorthand for `welcome().key`.
    pub fn welcome_key(&self) -> &Secret {
        &self.welcome.key
    }

    /// Shorthand for `welcome().nonce`.
    pub fn welcome_nonce(&self) -> &Secret {
        &self.welcome.nonce
    }
}

/// Welcome secret for `joiner_secret` and `psks`, without building the rest
/// of the join secrets.
///
/// Needs neither the group context nor the epoch secret, so a Welcome can be
/// decrypted before the group context is known.
pub fn welcome_secret<S: CipherSuite + ?Sized>(
    suite: &S,
    joiner_secret: &Secret,
    psks: &[PskEntry],
) -> Result<Secret, KeyScheduleError> {
    let psk_secret = psk_secret(suite, psks)?;
    let member_secret = Secret::extract(suite, joiner_secret, &psk_secret)?;
    member_secret.derive_secret(suite, WELCOME_LABEL)
}
