//! Procedural hierarchy: coordinates, token identifiers, generation.

pub mod hierarchy;
pub mod ident;
pub mod path;

pub use hierarchy::{Generator, ObjectDescription};
pub use ident::TokenId;
pub use path::{CoordinatePath, ObjectKind};
