//! Claim Records
//!
//! Types for the commit-reveal-stake lifecycle: holder identities,
//! commitment ids, pending claims, and ownership records.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::hash::{DomainHasher, Hash32};
use crate::gen::TokenId;

/// Domain separator for claim commitments.
const CLAIM_DOMAIN: &[u8] = b"SEEDVERSE_CLAIM_V1";

/// Reveal nonce chosen by the committer and kept secret until reveal.
pub type Nonce = [u8; 32];

/// A participant identity (16 opaque bytes, supplied by the caller's
/// identity layer).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct HolderId(pub [u8; 16]);

impl HolderId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Short hex rendering for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// A commitment hash naming a pending claim without revealing which
/// token it targets.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitmentId(pub Hash32);

impl CommitmentId {
    /// Compute the commitment for a token and nonce.
    ///
    /// Field order is fixed: domain, packed token id, nonce. This is
    /// the binding the reveal later has to reproduce.
    pub fn compute(token: &TokenId, nonce: &Nonce) -> Self {
        let mut hasher = DomainHasher::new(CLAIM_DOMAIN);
        hasher.update_bytes(&token.to_le_bytes());
        hasher.update_bytes(nonce);
        Self(hasher.finalize())
    }

    /// Canonical lowercase hex.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parse the canonical hex form.
    pub fn from_hex(text: &str) -> Result<Self, String> {
        let bytes = hex::decode(text).map_err(|e| format!("bad hex: {}", e))?;
        let hash: Hash32 = bytes
            .try_into()
            .map_err(|_| "expected 32 bytes".to_string())?;
        Ok(Self(hash))
    }
}

impl fmt::Debug for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentId({}..)", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Hex-string serde so commitment ids can key JSON maps.
impl Serialize for CommitmentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CommitmentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CommitmentId::from_hex(&text).map_err(D::Error::custom)
    }
}

/// A pending commitment: the Committed state of the lifecycle.
///
/// Window lengths are snapshotted at commit time, so later parameter
/// changes never retroactively invalidate a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Who committed.
    pub holder: HolderId,
    /// Staked deposit.
    pub deposit: u64,
    /// Clock reading at commit.
    pub committed_at: u64,
    /// Earliest reveal is `committed_at + maturation_window`.
    pub maturation_window: u64,
    /// Anyone may forfeit after `committed_at + forfeiture_window`.
    pub forfeiture_window: u64,
}

/// An ownership record: the Owned state of the lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// Current holder.
    pub holder: HolderId,
    /// Deposit returned on release.
    pub deposit: u64,
    /// Clock reading at reveal.
    pub owned_at: u64,
}

/// Lifecycle state of a token id as far as the registry can tell.
///
/// Pending commitments are hidden (that is the point of the protocol),
/// so `Unclaimed` means only "not currently owned".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimState {
    /// No ownership record exists.
    Unclaimed,
    /// A reveal bound the token to a holder.
    Owned,
}

/// Registry operation failures. All caller-recoverable and all
/// distinguishable, so a frontend can tell "too early" from "wrong
/// nonce".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Deposit below the current minimum-deposit parameter.
    #[error("deposit {offered} below minimum {minimum}")]
    InsufficientDeposit {
        /// What the committer offered.
        offered: u64,
        /// The current minimum.
        minimum: u64,
    },

    /// The maturation window has not elapsed yet.
    #[error("reveal at {now} before maturity {matures_at}")]
    PrematureReveal {
        /// Current clock reading.
        now: u64,
        /// Earliest allowed reveal.
        matures_at: u64,
    },

    /// The revealed token and nonce do not hash to the commitment.
    #[error("revealed token and nonce do not match the commitment")]
    CommitmentMismatch,

    /// The commitment or token slot is already taken.
    #[error("already claimed")]
    AlreadyClaimed,

    /// No pending commitment under that id.
    #[error("unknown commitment")]
    UnknownCommitment,

    /// The caller does not own the token.
    #[error("caller does not own this token")]
    NotOwner,

    /// Forfeit attempted before the forfeiture window elapsed.
    #[error("forfeit at {now} before {forfeitable_at}")]
    NotForfeitable {
        /// Current clock reading.
        now: u64,
        /// Earliest allowed forfeit.
        forfeitable_at: u64,
    },

    /// The caller is not allowed to perform this operation.
    #[error("caller not authorized")]
    Unauthorized,

    /// The backing store failed to persist or load state.
    #[error("storage failure: {0}")]
    Storage(String),
}
