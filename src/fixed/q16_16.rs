//! Q16.16 signed fixed-point accumulator: 16 integer bits, 16 fractional
//! bits. Exists only as the multiply-accumulate domain — nothing reads or
//! writes Q16.16 across the engine boundary.

use core::fmt;

use super::q8_8::Q8_8;

/// A Q16.16 accumulator value: 32-bit signed, value = `raw as f64 / 65536.0`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Q16_16(i32);

impl Q16_16 {
    /// The additive identity.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw Q16.16 bit pattern.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw Q16.16 bit pattern.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Saturating construction from a wider intermediate — used for sums
    /// that may overflow `i32` before clamping back into range.
    #[must_use]
    pub fn saturating_from_i64(value: i64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    /// Widen the exact product of two Q8.8 values into the Q16.16 domain.
    ///
    /// `a` and `b` have value `raw/256`; their product has value
    /// `raw_a*raw_b/65536`, which is exactly representable as a Q16.16 raw
    /// value of `raw_a*raw_b` — the multiply never needs saturation since
    /// `|raw_a|,|raw_b| <= 32768` keeps the product within `i32`.
    #[must_use]
    pub fn widen_mul(a: Q8_8, b: Q8_8) -> Self {
        let product = i32::from(a.raw()) * i32::from(b.raw());
        Self(product)
    }

    /// Saturating accumulate: `self + widen_mul(a, b)`.
    #[must_use]
    pub fn mac(self, a: Q8_8, b: Q8_8) -> Self {
        let sum = i64::from(self.0) + i64::from(Self::widen_mul(a, b).0);
        Self::saturating_from_i64(sum)
    }

    /// Narrow to Q8.8 with round-to-nearest-even and saturation. This is
    /// the one place precision is lost, and the accelerator path and the
    /// golden reference share this exact function so they cannot diverge.
    #[must_use]
    pub fn narrow(self) -> Q8_8 {
        let rounded = round_div_pow2_even(i64::from(self.0), 8);
        #[allow(clippy::cast_possible_truncation)]
        let clamped = rounded.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16;
        Q8_8::from_raw(clamped)
    }
}

impl fmt::Debug for Q16_16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q16_16({:.6})", f64::from(self.0) / 65536.0)
    }
}

/// Divide `x` by `2^shift`, rounding to nearest with ties rounded to even,
/// matching IEEE round-to-nearest-even semantics on the fixed-point raw
/// integer rather than on a float.
pub(super) fn round_div_pow2_even(x: i64, shift: u32) -> i64 {
    let half = 1i64 << (shift - 1);
    let mask = (1i64 << shift) - 1;
    let floor_part = x >> shift;
    let rem = x & mask;
    match rem.cmp(&half) {
        core::cmp::Ordering::Less => floor_part,
        core::cmp::Ordering::Greater => floor_part + 1,
        core::cmp::Ordering::Equal => {
            if floor_part % 2 == 0 {
                floor_part
            } else {
                floor_part + 1
            }
        }
    }
}
