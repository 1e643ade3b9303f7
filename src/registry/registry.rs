//! Claim Registry
//!
//! The commit-reveal-stake state machine. A participant who wants to
//! own an object commits to `hash(token, nonce)` with a stake, waits
//! out the maturation window, then reveals the token and nonce. The
//! commitment hides the target until the reveal, so watching the ledger
//! for interesting claims and front-running them gains nothing.
//!
//! This is the only module in the crate with shared mutable state. All
//! transitions serialize on one mutex, so racing commits for the same
//! slot resolve to exactly one winner. Every operation either fully
//! applies or has no effect.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::claim::{
    Claim, ClaimState, CommitmentId, HolderId, Nonce, Ownership, RegistryError,
};
use super::store::{ClaimStore, RegistryState};
use crate::gen::TokenId;

/// External clock contract. The registry only ever reads it; supplying
/// a tamper-resistant monotonic time source is the embedder's job.
pub trait Clock: Send + Sync {
    /// Current time in the embedder's unit (seconds in the demo).
    fn now(&self) -> u64;
}

/// Manually driven clock for tests and demos.
#[derive(Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now),
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: u64) {
        self.now
            .fetch_add(delta, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Access-control contract consulted before every mutating operation.
///
/// `target` is the token being revealed or released; commits pass
/// `None` because their target is still hidden. The policy itself
/// (balance gates, allowlists, open access) lives outside the core.
pub trait AccessPolicy: Send + Sync {
    /// May `caller` act on `target`?
    fn allow(&self, caller: HolderId, target: Option<&TokenId>) -> bool;
}

/// Policy that admits everyone.
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allow(&self, _caller: HolderId, _target: Option<&TokenId>) -> bool {
        true
    }
}

/// Process-wide tunable parameters.
///
/// Adjustable at runtime by the registry authority; window lengths are
/// snapshotted into each claim at commit, so changes are never
/// retroactive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryParams {
    /// Smallest accepted deposit.
    pub minimum_deposit: u64,
    /// Mandatory delay between commit and the earliest reveal.
    pub maturation_window: u64,
    /// Delay after which anyone may forfeit an unrevealed commitment.
    pub forfeiture_window: u64,
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            minimum_deposit: 1_000,
            maturation_window: 86_400,
            forfeiture_window: 2_592_000,
        }
    }
}

impl RegistryParams {
    /// Read overrides from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(fallback)
        };
        Self {
            minimum_deposit: read("SEEDVERSE_MIN_DEPOSIT", defaults.minimum_deposit),
            maturation_window: read("SEEDVERSE_MATURATION_WINDOW", defaults.maturation_window),
            forfeiture_window: read("SEEDVERSE_FORFEITURE_WINDOW", defaults.forfeiture_window),
        }
    }
}

/// The commit-reveal-stake registry.
pub struct ClaimRegistry {
    state: Mutex<RegistryState>,
    clock: Box<dyn Clock>,
    policy: Box<dyn AccessPolicy>,
    store: Box<dyn ClaimStore>,
    authority: HolderId,
}

impl ClaimRegistry {
    /// Open a registry, resuming from the store's snapshot when one
    /// exists; otherwise start empty with the given parameters.
    pub fn open(
        params: RegistryParams,
        authority: HolderId,
        clock: Box<dyn Clock>,
        policy: Box<dyn AccessPolicy>,
        store: Box<dyn ClaimStore>,
    ) -> Result<Self, RegistryError> {
        let state = store
            .load()
            .map_err(|e| RegistryError::Storage(e.to_string()))?
            .unwrap_or_else(|| RegistryState {
                params,
                ..RegistryState::default()
            });
        Ok(Self {
            state: Mutex::new(state),
            clock,
            policy,
            store,
            authority,
        })
    }

    /// Stake a deposit on a hidden commitment: Unclaimed -> Committed.
    ///
    /// Fails with `InsufficientDeposit` below the minimum parameter and
    /// `AlreadyClaimed` if the commitment id is already pending. The
    /// window lengths in force right now are recorded on the claim.
    pub fn commit(
        &self,
        caller: HolderId,
        commitment: CommitmentId,
        deposit: u64,
    ) -> Result<(), RegistryError> {
        if !self.policy.allow(caller, None) {
            return Err(RegistryError::Unauthorized);
        }
        let now = self.clock.now();
        let mut state = self.lock_state();

        if deposit < state.params.minimum_deposit {
            return Err(RegistryError::InsufficientDeposit {
                offered: deposit,
                minimum: state.params.minimum_deposit,
            });
        }
        if state.commitments.contains_key(&commitment) {
            return Err(RegistryError::AlreadyClaimed);
        }

        // Mutate a working copy and persist it before swapping it in,
        // so a storage failure leaves the registry untouched.
        let mut next = state.clone();
        next.commitments.insert(
            commitment,
            Claim {
                holder: caller,
                deposit,
                committed_at: now,
                maturation_window: state.params.maturation_window,
                forfeiture_window: state.params.forfeiture_window,
            },
        );
        next.total_staked = next.total_staked.saturating_add(deposit);
        self.persist(&next)?;
        *state = next;

        info!(
            holder = %caller.short_hex(),
            commitment = %commitment,
            deposit,
            "commit accepted"
        );
        Ok(())
    }

    /// Prove a commitment and take ownership: Committed -> Owned.
    ///
    /// The commitment must exist, the token and nonce must hash to it,
    /// the maturation window must have elapsed, the caller must be the
    /// committer, and the token must not already be owned. Each failure
    /// is distinguishable.
    pub fn reveal(
        &self,
        caller: HolderId,
        commitment: CommitmentId,
        token: TokenId,
        nonce: &Nonce,
    ) -> Result<(), RegistryError> {
        if !self.policy.allow(caller, Some(&token)) {
            return Err(RegistryError::Unauthorized);
        }
        let now = self.clock.now();
        let mut state = self.lock_state();

        let claim = state
            .commitments
            .get(&commitment)
            .ok_or(RegistryError::UnknownCommitment)?
            .clone();

        if CommitmentId::compute(&token, nonce) != commitment {
            return Err(RegistryError::CommitmentMismatch);
        }
        if claim.holder != caller {
            return Err(RegistryError::Unauthorized);
        }
        let matures_at = claim.committed_at.saturating_add(claim.maturation_window);
        if now < matures_at {
            return Err(RegistryError::PrematureReveal { now, matures_at });
        }
        if state.owners.contains_key(&token) {
            return Err(RegistryError::AlreadyClaimed);
        }

        let mut next = state.clone();
        next.commitments.remove(&commitment);
        next.owners.insert(
            token,
            Ownership {
                holder: caller,
                deposit: claim.deposit,
                owned_at: now,
            },
        );
        self.persist(&next)?;
        *state = next;

        info!(
            holder = %caller.short_hex(),
            token = %token,
            "reveal accepted, token owned"
        );
        Ok(())
    }

    /// Destroy an abandoned commitment and retain its deposit:
    /// Committed -> gone, deposit to the forfeited pool.
    ///
    /// Callable by anyone once the claim's forfeiture window has
    /// elapsed; this is the commit-and-abandon spam deterrent.
    pub fn forfeit(
        &self,
        caller: HolderId,
        commitment: CommitmentId,
    ) -> Result<u64, RegistryError> {
        if !self.policy.allow(caller, None) {
            return Err(RegistryError::Unauthorized);
        }
        let now = self.clock.now();
        let mut state = self.lock_state();

        let claim = state
            .commitments
            .get(&commitment)
            .ok_or(RegistryError::UnknownCommitment)?
            .clone();

        let forfeitable_at = claim.committed_at.saturating_add(claim.forfeiture_window);
        if now < forfeitable_at {
            return Err(RegistryError::NotForfeitable { now, forfeitable_at });
        }

        let mut next = state.clone();
        next.commitments.remove(&commitment);
        next.total_staked = next.total_staked.saturating_sub(claim.deposit);
        next.forfeited_pool = next.forfeited_pool.saturating_add(claim.deposit);
        self.persist(&next)?;
        *state = next;

        info!(
            commitment = %commitment,
            deposit = claim.deposit,
            "commitment forfeited"
        );
        Ok(claim.deposit)
    }

    /// Give up an owned token and reclaim the deposit: Owned ->
    /// Unclaimed. Returns the refunded amount.
    pub fn release(&self, caller: HolderId, token: TokenId) -> Result<u64, RegistryError> {
        if !self.policy.allow(caller, Some(&token)) {
            return Err(RegistryError::Unauthorized);
        }
        let mut state = self.lock_state();

        let record = state.owners.get(&token).ok_or(RegistryError::NotOwner)?;
        if record.holder != caller {
            return Err(RegistryError::NotOwner);
        }
        let deposit = record.deposit;

        let mut next = state.clone();
        next.owners.remove(&token);
        next.total_staked = next.total_staked.saturating_sub(deposit);
        self.persist(&next)?;
        *state = next;

        info!(holder = %caller.short_hex(), token = %token, deposit, "token released");
        Ok(deposit)
    }

    /// Adjust the tunable parameters. Authority only; never touches
    /// claims already in flight.
    pub fn set_params(
        &self,
        caller: HolderId,
        params: RegistryParams,
    ) -> Result<(), RegistryError> {
        if caller != self.authority {
            return Err(RegistryError::Unauthorized);
        }
        let mut state = self.lock_state();
        let mut next = state.clone();
        next.params = params;
        self.persist(&next)?;
        *state = next;
        info!(?params, "registry parameters updated");
        Ok(())
    }

    /// Current parameters.
    pub fn params(&self) -> RegistryParams {
        self.lock_state().params
    }

    /// Current owner of a token, if any.
    pub fn owner_of(&self, token: &TokenId) -> Option<HolderId> {
        self.lock_state().owners.get(token).map(|o| o.holder)
    }

    /// Is this token currently owned?
    pub fn is_claimed(&self, token: &TokenId) -> bool {
        self.lock_state().owners.contains_key(token)
    }

    /// Visible lifecycle state of a token. Pending commitments stay
    /// hidden by design.
    pub fn state_of(&self, token: &TokenId) -> ClaimState {
        if self.is_claimed(token) {
            ClaimState::Owned
        } else {
            ClaimState::Unclaimed
        }
    }

    /// Look up a pending commitment.
    pub fn commitment_of(&self, commitment: &CommitmentId) -> Option<Claim> {
        self.lock_state().commitments.get(commitment).cloned()
    }

    /// Sum of all deposits currently held.
    pub fn total_staked(&self) -> u64 {
        self.lock_state().total_staked
    }

    /// Deposits retained from forfeited commitments.
    pub fn forfeited_pool(&self) -> u64 {
        self.lock_state().forfeited_pool
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry mutex poisoned")
    }

    fn persist(&self, state: &RegistryState) -> Result<(), RegistryError> {
        self.store
            .save(state)
            .map_err(|e| RegistryError::Storage(e.to_string()))
    }
}
