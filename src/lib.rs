//! # Seedverse
//!
//! Deterministic procedural-universe core with a commit-reveal-stake
//! ownership registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SEEDVERSE                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q87.40 fixed-point arithmetic             │
//! │  ├── rng.rs      - Hash-derived seeds and pure draws         │
//! │  └── hash.rs     - Domain-separated SHA-256 hashing          │
//! │                                                              │
//! │  gen/            - Procedural generation (deterministic)     │
//! │  ├── path.rs     - Coordinate paths through the hierarchy    │
//! │  ├── ident.rs    - Bit-packed canonical object identifiers   │
//! │  └── hierarchy.rs- Sector/system/planet/moon/land generator  │
//! │                                                              │
//! │  registry/       - Ownership (stateful)                      │
//! │  ├── claim.rs    - Commitments, claims, ownership records    │
//! │  ├── registry.rs - Commit-reveal-stake state machine         │
//! │  └── store.rs    - Snapshot persistence                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `gen/` modules are **100% deterministic**:
//! - No floating-point arithmetic in generation logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from domain-separated SHA-256 seed derivation
//!
//! Given the same root seed, any two parties compute **identical
//! universes** on any platform, in any order, with no shared state.
//! The registry is the only stateful module; generation never touches
//! it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod gen;
pub mod registry;

// Re-export commonly used types
pub use crate::core::fixed::{Real, REAL_FBITS, REAL_ONE};
pub use crate::core::rng::Seed;
pub use crate::core::NumericError;
pub use gen::{CoordinatePath, Generator, ObjectDescription, ObjectKind, TokenId};
pub use registry::{
    ClaimRegistry, ClaimState, CommitmentId, HolderId, RegistryError, RegistryParams,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
