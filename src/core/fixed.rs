//! Q87.40 Fixed-Point Arithmetic
//!
//! Deterministic signed fixed-point math for universe generation.
//! All operations use integer arithmetic only - results are bit-identical
//! on every platform and in every independent implementation.
//!
//! ## Format: Q87.40
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q87.40 (128-bit signed integer)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][III...III][FFF...FFF]                                  │
//! │   │  └ 87 bits ┘└ 40 bits ┘                                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: magnitude < 2^87 ≈ 1.5e26                           │
//! │  Precision: 2^-40 ≈ 9.1e-13                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Q87.40?
//!
//! - 40 fractional bits carry astronomical ratios (AU per planetary
//!   radius, solar masses) without drift across a derivation chain
//! - 87 integral bits cover sector-scale distances in meters
//! - Multiply and divide widen to 256 bits internally, so no precision
//!   is lost before scaling back down

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NumericError;

/// Number of fractional bits (40).
pub const REAL_FBITS: u32 = 40;

/// 1.0 in fixed-point.
pub const REAL_ONE: i128 = 1 << REAL_FBITS;

/// 0.5 in fixed-point.
pub const REAL_HALF: i128 = REAL_ONE >> 1;

/// 2.0 in fixed-point.
pub const REAL_TWO: i128 = REAL_ONE << 1;

/// ln(2) in fixed-point: round(0.693147... * 2^40).
pub const REAL_LN_TWO: i128 = 762_123_384_786;

/// pi in fixed-point: round(3.141592... * 2^40).
pub const REAL_PI: i128 = 3_454_217_652_358;

/// 2*pi in fixed-point.
pub const REAL_TWO_PI: i128 = 6_908_435_304_715;

/// pi/2 in fixed-point.
pub const REAL_HALF_PI: i128 = 1_727_108_826_179;

/// Number of integral magnitude bits (87).
const REAL_IBITS: u32 = 128 - REAL_FBITS - 1;

/// Largest finite f64 magnitude accepted by [`Real::from_f64`]: 2^87.
const F64_CEILING: f64 = 1.5474250491067253e26;

/// Newton iteration cap for [`Real::sqrt`]. The bit-length initial guess
/// converges in well under 16 steps; the cap only bounds the loop.
const SQRT_MAX_ITERS: usize = 96;

/// Taylor terms for [`Real::exp`] after range reduction to |r| <= ln(2)/2.
const EXP_TAYLOR_TERMS: u32 = 17;

/// Taylor terms for [`Real::sin`] / [`Real::cos`] after reduction to
/// [-pi, pi]. 10 terms of each parity.
const TRIG_TAYLOR_TERMS: u32 = 10;

/// Signed Q87.40 fixed-point number.
///
/// Arithmetic is checked: any result that would not fit the 128-bit
/// representation fails with [`NumericError::RangeError`] instead of
/// wrapping or clamping. Two independent processes computing the same
/// expression always produce the same bits.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Real(i128);

impl Real {
    /// Zero constant.
    pub const ZERO: Self = Self(0);

    /// One constant.
    pub const ONE: Self = Self(REAL_ONE);

    /// One half.
    pub const HALF: Self = Self(REAL_HALF);

    /// pi.
    pub const PI: Self = Self(REAL_PI);

    /// Create from the raw scaled integer representation.
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Get the raw scaled integer representation.
    #[inline]
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Create from an integer. Total: every i64 fits the integral width.
    #[inline]
    pub const fn from_int(i: i64) -> Self {
        Self((i as i128) << REAL_FBITS)
    }

    /// Convert an f64 to fixed-point, truncating toward zero at bit 40.
    ///
    /// Fails with `RangeError` if the magnitude is at or above 2^87, or
    /// if the input is NaN or infinite.
    pub fn from_f64(x: f64) -> Result<Self, NumericError> {
        if !x.is_finite() || x.abs() >= F64_CEILING {
            return Err(NumericError::RangeError);
        }
        // |x| < 2^87, so the scaled value is < 2^127 and the cast cannot
        // saturate. f64-to-int casts truncate toward zero.
        Ok(Self((x * REAL_ONE as f64) as i128))
    }

    /// Convert to f64 for display. Lossy above 2^53; never fails.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / REAL_ONE as f64
    }

    /// True if the value is negative.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition.
    #[inline]
    pub fn checked_add(self, rhs: Self) -> Result<Self, NumericError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(NumericError::RangeError)
    }

    /// Checked subtraction.
    #[inline]
    pub fn checked_sub(self, rhs: Self) -> Result<Self, NumericError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(NumericError::RangeError)
    }

    /// Checked multiplication.
    ///
    /// The full 256-bit product is formed from 64-bit limbs before the
    /// scale shift, so no intermediate precision is lost. Truncates
    /// toward zero.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, NumericError> {
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let a = self.0.unsigned_abs();
        let b = rhs.0.unsigned_abs();

        let (hi, lo) = mul_wide(a, b);
        // Scale back down: (hi:lo) >> 40.
        if hi >> REAL_FBITS != 0 {
            return Err(NumericError::RangeError);
        }
        let mag = (hi << (128 - REAL_FBITS)) | (lo >> REAL_FBITS);
        magnitude_to_real(mag, negative)
    }

    /// Checked division.
    ///
    /// The numerator is pre-shifted into a 256-bit intermediate so the
    /// quotient keeps all 40 fractional bits. Truncates toward zero.
    /// Fails with `DivisionByZero` on a zero divisor.
    pub fn checked_div(self, rhs: Self) -> Result<Self, NumericError> {
        if rhs.0 == 0 {
            return Err(NumericError::DivisionByZero);
        }
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let a = self.0.unsigned_abs();
        let b = rhs.0.unsigned_abs();

        // (a << 40) as a 256-bit value.
        let n_hi = a >> (128 - REAL_FBITS);
        let n_lo = a << REAL_FBITS;
        let mag = div_wide(n_hi, n_lo, b).ok_or(NumericError::RangeError)?;
        magnitude_to_real(mag, negative)
    }

    /// Absolute value. Fails with `RangeError` only at the representation's
    /// own lower boundary (the most negative raw value has no positive twin).
    #[inline]
    pub fn abs(self) -> Result<Self, NumericError> {
        self.0
            .checked_abs()
            .map(Self)
            .ok_or(NumericError::RangeError)
    }

    /// Round to the nearest integer value, half up.
    ///
    /// Exactly .5 rounds toward positive infinity: 2.5 -> 3, -1.5 -> -1.
    /// Fails with `RangeError` only within half a unit of the top of the
    /// representable range.
    pub fn round(self) -> Result<Self, NumericError> {
        let shifted = self
            .0
            .checked_add(REAL_HALF)
            .ok_or(NumericError::RangeError)?;
        // Arithmetic shift floors, which after the +0.5 bias is half-up.
        Ok(Self((shifted >> REAL_FBITS) << REAL_FBITS))
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub fn ipart(self) -> Self {
        // i128 division truncates toward zero, unlike a shift.
        Self(self.0 / REAL_ONE * REAL_ONE)
    }

    /// Fractional part of the magnitude. Always non-negative and
    /// independent of sign: fpart(-1.25) == fpart(1.25) == 0.25.
    #[inline]
    pub fn fpart(self) -> Self {
        Self((self.0.unsigned_abs() & (REAL_ONE as u128 - 1)) as i128)
    }

    /// Integer value of `ipart`, for callers that index with the result.
    #[inline]
    pub fn to_int(self) -> i128 {
        self.0 / REAL_ONE
    }

    /// Square root by Newton-Raphson.
    ///
    /// Fails with `RangeError` on negative input. The initial guess is
    /// taken from the bit length of the operand, then refined until the
    /// iteration reaches its fixed point; the loop is capped at
    /// `SQRT_MAX_ITERS` steps. Same inputs take the same path on every
    /// platform, so independent implementations agree bit-for-bit.
    ///
    /// Max absolute error: one unit in the last place (2^-40) versus the
    /// real-valued square root, from truncating division.
    pub fn sqrt(self) -> Result<Self, NumericError> {
        if self.0 < 0 {
            return Err(NumericError::RangeError);
        }
        if self.0 == 0 {
            return Ok(Self::ZERO);
        }

        // Initial guess 2^ceil(e/2) where e is the exponent of the value,
        // within a factor of sqrt(2) of the true root.
        let bits = 128 - self.0.leading_zeros() as i32;
        let exponent = bits - 1 - REAL_FBITS as i32;
        let guess_exp = if exponent >= 0 {
            (exponent + 1) / 2
        } else {
            exponent / 2
        };
        let shift = REAL_FBITS as i32 + guess_exp;
        let mut guess = if shift >= 0 { Self(1 << shift) } else { Self(1) };

        let mut prev = Self::ZERO;
        for _ in 0..SQRT_MAX_ITERS {
            let quotient = self.checked_div(guess)?;
            let next = Self((guess.0 + quotient.0) >> 1);
            if next == guess || next == prev {
                break;
            }
            prev = guess;
            guess = next;
        }

        // Integer Newton oscillates across the root by one step; settle
        // on the floor.
        let square = guess.checked_mul(guess)?;
        if square.0 > self.0 {
            guess = Self(guess.0 - 1);
        }
        Ok(guess)
    }

    /// Natural exponential.
    ///
    /// Range-reduces by ln(2) so e^x = 2^n * e^r with |r| <= ln(2)/2, then
    /// evaluates a 17-term Taylor series for e^r. Fails with `RangeError`
    /// when the result exceeds the representable range (x above ~60.3);
    /// deep negative inputs underflow to the nearest representable value,
    /// which is zero.
    ///
    /// Max error: about 2^-38 relative to the true exponential over the
    /// supported domain.
    pub fn exp(self) -> Result<Self, NumericError> {
        // 2^87 < e^61, and anything below e^-89 truncates to zero, so the
        // reduction exponent always fits comfortably in i64.
        if self.0 > 61 * REAL_ONE {
            return Err(NumericError::RangeError);
        }
        if self.0 < -89 * REAL_ONE {
            return Ok(Self::ZERO);
        }

        // n = round(x / ln 2)
        let n = self.checked_div(Self(REAL_LN_TWO))?.round()?.to_int();
        let reduction = Self(REAL_LN_TWO).checked_mul(Self::from_int(n as i64))?;
        let r = self.checked_sub(reduction)?;

        // Taylor: e^r = sum r^k / k!
        let mut term = Self::ONE;
        let mut sum = Self::ONE;
        for k in 1..EXP_TAYLOR_TERMS {
            term = term.checked_mul(r)?;
            term = Self(term.0 / k as i128);
            sum = sum.checked_add(term)?;
        }

        // Apply the 2^n factor.
        if n >= 0 {
            if n >= (REAL_IBITS as i128) || (sum.0.leading_zeros() as i128) <= n {
                return Err(NumericError::RangeError);
            }
            Ok(Self(sum.0 << n))
        } else if -n >= 128 {
            Ok(Self::ZERO)
        } else {
            Ok(Self(sum.0 >> (-n)))
        }
    }

    /// Sine.
    ///
    /// Reduces the argument into [-pi, pi] and evaluates a 10-term odd
    /// Taylor series. Max absolute error a few parts in 1e9 at the
    /// interval edges; much tighter near zero.
    pub fn sin(self) -> Result<Self, NumericError> {
        let r = reduce_angle(self)?;

        // sin r = r - r^3/3! + r^5/5! - ...
        let r2 = r.checked_mul(r)?;
        let mut term = r;
        let mut sum = r;
        for k in 1..TRIG_TAYLOR_TERMS {
            let divisor = (2 * k) as i128 * (2 * k + 1) as i128;
            term = term.checked_mul(r2)?;
            term = Self(-term.0 / divisor);
            sum = sum.checked_add(term)?;
        }
        Ok(sum)
    }

    /// Cosine, via the same reduction and an even Taylor series.
    /// Same error bound as [`Real::sin`].
    pub fn cos(self) -> Result<Self, NumericError> {
        let r = reduce_angle(self)?;

        let r2 = r.checked_mul(r)?;
        let mut term = Self::ONE;
        let mut sum = Self::ONE;
        for k in 1..TRIG_TAYLOR_TERMS {
            let divisor = (2 * k - 1) as i128 * (2 * k) as i128;
            term = term.checked_mul(r2)?;
            term = Self(-term.0 / divisor);
            sum = sum.checked_add(term)?;
        }
        Ok(sum)
    }
}

/// Reduce an angle into [-pi, pi] by whole turns.
fn reduce_angle(x: Real) -> Result<Real, NumericError> {
    let turns = x.checked_div(Real(REAL_TWO_PI))?.round()?.to_int();
    if turns > i64::MAX as i128 || turns < i64::MIN as i128 {
        // The 2*pi constant carries no useful precision at this scale.
        return Err(NumericError::RangeError);
    }
    let whole = Real(REAL_TWO_PI).checked_mul(Real::from_int(turns as i64))?;
    x.checked_sub(whole)
}

/// Apply a sign to an unsigned magnitude, rejecting values that do not
/// fit the signed representation.
#[inline]
fn magnitude_to_real(mag: u128, negative: bool) -> Result<Real, NumericError> {
    if mag > i128::MAX as u128 {
        return Err(NumericError::RangeError);
    }
    let value = mag as i128;
    Ok(Real(if negative { -value } else { value }))
}

/// Full 128x128 -> 256-bit unsigned multiply, returned as (hi, lo).
///
/// Schoolbook over 64-bit limbs; every partial product fits u128.
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    let a_lo = a as u64 as u128;
    let a_hi = a >> 64;
    let b_lo = b as u64 as u128;
    let b_hi = b >> 64;

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let (mid, mid_carry) = lh.overflowing_add(hl);
    let (lo, lo_carry) = ll.overflowing_add(mid << 64);
    let hi = hh + (mid >> 64) + ((mid_carry as u128) << 64) + lo_carry as u128;

    (hi, lo)
}

/// Divide a 256-bit numerator (hi:lo) by a 128-bit divisor using binary
/// long division. Returns `None` if the quotient does not fit u128 or
/// the divisor is zero.
fn div_wide(n_hi: u128, n_lo: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    if n_hi == 0 {
        return Some(n_lo / d);
    }
    // The quotient fits 128 bits only if hi < d.
    if n_hi >= d {
        return None;
    }

    let mut rem = n_hi;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        let bit = (n_lo >> i) & 1;
        // rem < d <= 2^127, so the shift cannot overflow.
        rem = (rem << 1) | bit;
        quotient <<= 1;
        if rem >= d {
            rem -= d;
            quotient |= 1;
        }
    }
    Some(quotient)
}

impl fmt::Debug for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Real({:.6})", self.to_f64())
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(REAL_ONE, 1_099_511_627_776);
        assert_eq!(REAL_HALF, REAL_ONE / 2);
        assert_eq!(REAL_TWO, REAL_ONE * 2);
        assert_eq!(Real::ONE.to_f64(), 1.0);
        assert_eq!(Real::from_int(-3).to_f64(), -3.0);
    }

    #[test]
    fn test_from_f64_roundtrip() {
        for &x in &[0.0, 1.0, -1.0, 0.5, 1234.5678, -98765.4321, 1e20, -1e20] {
            let real = Real::from_f64(x).unwrap();
            let back = real.to_f64();
            let ulp = 1.0 / REAL_ONE as f64;
            assert!(
                (back - x).abs() <= ulp * x.abs().max(1.0),
                "roundtrip {} -> {}",
                x,
                back
            );
        }
    }

    #[test]
    fn test_from_f64_rejects_ceiling() {
        assert_eq!(Real::from_f64(F64_CEILING), Err(NumericError::RangeError));
        assert_eq!(Real::from_f64(-F64_CEILING), Err(NumericError::RangeError));
        assert_eq!(Real::from_f64(f64::NAN), Err(NumericError::RangeError));
        assert_eq!(Real::from_f64(f64::INFINITY), Err(NumericError::RangeError));
        // Just inside the ceiling is fine.
        assert!(Real::from_f64(F64_CEILING / 2.0).is_ok());
    }

    #[test]
    fn test_truncation_toward_zero() {
        // from_f64 truncates at bit 40 toward zero for both signs.
        let tiny = 1.0 / REAL_ONE as f64 / 4.0;
        assert_eq!(Real::from_f64(tiny).unwrap().raw(), 0);
        assert_eq!(Real::from_f64(-tiny).unwrap().raw(), 0);
    }

    #[test]
    fn test_mul() {
        let a = Real::from_int(2);
        let b = Real::from_int(3);
        assert_eq!(a.checked_mul(b).unwrap(), Real::from_int(6));

        let half = Real::HALF;
        assert_eq!(half.checked_mul(half).unwrap().raw(), REAL_ONE / 4);

        let neg = Real::from_int(-2);
        assert_eq!(neg.checked_mul(b).unwrap(), Real::from_int(-6));
        assert_eq!(neg.checked_mul(neg).unwrap(), Real::from_int(4));
    }

    #[test]
    fn test_mul_overflow() {
        let big = Real::from_raw(i128::MAX / 2);
        assert_eq!(
            big.checked_mul(Real::from_int(1_000_000)),
            Err(NumericError::RangeError)
        );
        // Large * small stays in range.
        assert!(big.checked_mul(Real::HALF).is_ok());
    }

    #[test]
    fn test_div() {
        let a = Real::from_int(6);
        let b = Real::from_int(2);
        assert_eq!(a.checked_div(b).unwrap(), Real::from_int(3));

        assert_eq!(
            Real::ONE.checked_div(Real::from_int(4)).unwrap().raw(),
            REAL_ONE / 4
        );

        assert_eq!(
            Real::ONE.checked_div(Real::ZERO),
            Err(NumericError::DivisionByZero)
        );

        let neg = Real::from_int(-6);
        assert_eq!(neg.checked_div(b).unwrap(), Real::from_int(-3));
    }

    #[test]
    fn test_div_precision() {
        // 1/3 keeps all 40 fractional bits: floor(2^40 / 3).
        let third = Real::ONE.checked_div(Real::from_int(3)).unwrap();
        assert_eq!(third.raw(), REAL_ONE / 3);
    }

    #[test]
    fn test_mul_div_inverse() {
        // round(div(mul(a, b), b)) == a for exact inputs.
        let values = [1i64, 2, 7, 1000, -5, 123_456, -987_654];
        for &a in &values {
            for &b in &values {
                let ra = Real::from_int(a);
                let rb = Real::from_int(b);
                let product = ra.checked_mul(rb).unwrap();
                let back = product.checked_div(rb).unwrap().round().unwrap();
                assert_eq!(back, ra, "a={} b={}", a, b);
            }
        }
    }

    #[test]
    fn test_round_half_up() {
        let cases = [
            (2.5, 3.0),
            (2.4, 2.0),
            (2.6, 3.0),
            (-1.5, -1.0),
            (-1.6, -2.0),
            (-0.5, 0.0),
            (0.5, 1.0),
        ];
        for &(input, expected) in &cases {
            let rounded = Real::from_f64(input).unwrap().round().unwrap();
            assert_eq!(rounded.to_f64(), expected, "round({})", input);
        }
    }

    #[test]
    fn test_abs_fpart_ipart() {
        let x = Real::from_f64(-1.25).unwrap();
        assert_eq!(x.abs().unwrap().to_f64(), 1.25);
        assert_eq!(x.fpart().to_f64(), 0.25);
        assert_eq!(x.ipart().to_f64(), -1.0);

        let y = Real::from_f64(1.25).unwrap();
        assert_eq!(y.fpart(), x.fpart());

        assert_eq!(
            Real::from_raw(i128::MIN).abs(),
            Err(NumericError::RangeError)
        );
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(Real::from_int(4).sqrt().unwrap(), Real::from_int(2));
        assert_eq!(Real::ZERO.sqrt().unwrap(), Real::ZERO);
        assert_eq!(Real::from_int(-1).sqrt(), Err(NumericError::RangeError));

        // Within a couple of ulps of the true root across scales.
        for &x in &[2.0, 10.0, 0.25, 123456.789, 1e12] {
            let root = Real::from_f64(x).unwrap().sqrt().unwrap().to_f64();
            let err = (root - x.sqrt()).abs();
            assert!(
                err <= 2.0 / REAL_ONE as f64 * x.sqrt().max(1.0),
                "sqrt({})",
                x
            );
        }
    }

    #[test]
    fn test_sqrt_determinism() {
        let x = Real::from_f64(7.7).unwrap();
        assert_eq!(x.sqrt().unwrap().raw(), x.sqrt().unwrap().raw());
    }

    #[test]
    fn test_exp() {
        assert_eq!(Real::ZERO.exp().unwrap(), Real::ONE);

        for &x in &[1.0, -1.0, 2.5, -7.0, 10.0, 0.001] {
            let result = Real::from_f64(x).unwrap().exp().unwrap().to_f64();
            let expected = x.exp();
            let rel = (result - expected).abs() / expected;
            assert!(rel < 1e-9, "exp({}) = {} want {}", x, result, expected);
        }

        // Overflow is reported, not wrapped.
        assert_eq!(Real::from_int(100).exp(), Err(NumericError::RangeError));
        // Deep underflow reaches the nearest representable value.
        assert_eq!(Real::from_int(-200).exp().unwrap(), Real::ZERO);
    }

    #[test]
    fn test_trig() {
        for &x in &[0.0, 0.5, 1.0, -1.0, 3.0, -3.0, 6.5, 100.0] {
            let r = Real::from_f64(x).unwrap();
            let sin_err = (r.sin().unwrap().to_f64() - x.sin()).abs();
            let cos_err = (r.cos().unwrap().to_f64() - x.cos()).abs();
            assert!(sin_err < 1e-8, "sin({}) err {}", x, sin_err);
            assert!(cos_err < 1e-8, "cos({}) err {}", x, cos_err);
        }
    }

    #[test]
    fn test_wide_helpers() {
        // 2^80 * 2^80 = 2^160: hi = 2^32.
        let (hi, lo) = mul_wide(1 << 80, 1 << 80);
        assert_eq!(hi, 1 << 32);
        assert_eq!(lo, 0);

        assert_eq!(div_wide(0, 100, 7), Some(14));
        assert_eq!(div_wide(1, 0, 1 << 100), Some(1 << 28));
        assert_eq!(div_wide(1, 0, 0), None);
        // Quotient would need more than 128 bits.
        assert_eq!(div_wide(u128::MAX, 0, 1), None);
    }

    #[test]
    fn test_arithmetic_determinism() {
        let a = Real::from_raw(123_456_789_012_345_678);
        let b = Real::from_raw(-987_654_321_098_765_432);
        for _ in 0..100 {
            assert_eq!(a.checked_mul(b), a.checked_mul(b));
            assert_eq!(a.checked_div(b), a.checked_div(b));
        }
    }
}
