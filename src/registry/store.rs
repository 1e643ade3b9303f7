//! Registry Persistence
//!
//! The claim table and its parameters must survive process restarts.
//! [`ClaimStore`] is the seam: the registry hands it a serializable
//! snapshot after every successful state transition and asks for one
//! back at startup. Tests swap in [`MemoryStore`]; production uses
//! [`JsonFileStore`] or any engine with atomic whole-value writes.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::claim::{Claim, CommitmentId, Ownership};
use super::registry::RegistryParams;
use crate::gen::TokenId;

/// Storage failures, kept apart from protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be parsed.
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The registry's full persistent state.
///
/// BTreeMaps keep iteration (and therefore serialization) order
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    /// Current tunable parameters.
    pub params: RegistryParams,
    /// Pending commitments by commitment id.
    pub commitments: BTreeMap<CommitmentId, Claim>,
    /// Ownership records by token id.
    pub owners: BTreeMap<TokenId, Ownership>,
    /// Sum of all deposits currently held (pending plus owned).
    pub total_staked: u64,
    /// Deposits retained from forfeited commitments.
    pub forfeited_pool: u64,
}

/// Snapshot persistence for [`RegistryState`].
pub trait ClaimStore: Send + Sync {
    /// Load the last saved snapshot, or `None` on first start.
    fn load(&self) -> Result<Option<RegistryState>, StoreError>;

    /// Atomically replace the snapshot.
    fn save(&self, state: &RegistryState) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral registries.
///
/// Holds the serialized form rather than the state itself, so it
/// exercises the same serde path as a durable store.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStore for MemoryStore {
    fn load(&self) -> Result<Option<RegistryState>, StoreError> {
        let guard = self.snapshot.lock().expect("store mutex poisoned");
        match guard.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &RegistryState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        *self.snapshot.lock().expect("store mutex poisoned") = Some(json);
        Ok(())
    }
}

/// File-backed store: JSON snapshot written to a temp file and renamed
/// into place, which is atomic on POSIX filesystems.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store at the given path. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClaimStore for JsonFileStore {
    fn load(&self) -> Result<Option<RegistryState>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &RegistryState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::claim::HolderId;

    fn sample_state() -> RegistryState {
        let mut state = RegistryState::default();
        state.total_staked = 500;
        state.owners.insert(
            TokenId::encode(&crate::gen::CoordinatePath::Sector { x: 1, y: 2, z: 3 }).unwrap(),
            Ownership {
                holder: HolderId::new([1; 16]),
                deposit: 500,
                owned_at: 42,
            },
        );
        state
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("seedverse-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = JsonFileStore::new(dir.join("registry.json"));
        assert!(store.load().unwrap().is_none());

        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_snapshot_is_stable_json() {
        let store = MemoryStore::new();
        store.save(&sample_state()).unwrap();
        let first = store.snapshot.lock().unwrap().clone().unwrap();
        store.save(&sample_state()).unwrap();
        let second = store.snapshot.lock().unwrap().clone().unwrap();
        // BTreeMap ordering makes snapshots byte-stable.
        assert_eq!(first, second);
    }
}
