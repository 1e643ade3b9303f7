//! Deterministic primitives: fixed-point math, seeded randomness, hashing.
//!
//! Everything in this module is a pure function of its inputs. Two
//! independent processes evaluating the same expression always get the
//! same bits, which is what lets participants generate the universe
//! locally instead of exchanging it.

pub mod fixed;
pub mod hash;
pub mod rng;

use thiserror::Error;

/// Numeric failure conditions. All are caller-recoverable; nothing in
/// the fixed-point layer panics or clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumericError {
    /// Result or input is outside the representable Q87.40 range.
    #[error("value outside representable fixed-point range")]
    RangeError,

    /// Division by a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
}
