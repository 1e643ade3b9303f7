//! Ownership registry: commit-reveal-stake claims over generated
//! objects, with pluggable clock, access policy, and persistence.

pub mod claim;
pub mod registry;
pub mod store;

pub use claim::{Claim, ClaimState, CommitmentId, HolderId, Nonce, Ownership, RegistryError};
pub use registry::{AccessPolicy, AllowAll, ClaimRegistry, Clock, ManualClock, RegistryParams};
pub use store::{ClaimStore, JsonFileStore, MemoryStore, RegistryState};
