//! Q8.8 signed fixed-point scalar: 8 integer bits, 8 fractional bits.

use core::fmt;

/// A single Q8.8 element: 16-bit signed, value = `raw as f64 / 256.0`.
///
/// Never exposes its raw `i16` pattern except through [`Q8_8::raw`] /
/// [`Q8_8::from_raw`] — callers that want element arithmetic should go
/// through [`crate::fixed::mul_q8_8`], [`crate::fixed::mac`] and
/// [`crate::fixed::narrow`] instead.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Q8_8(i16);

impl Q8_8 {
    /// The additive identity.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw Q8.8 bit pattern.
    #[must_use]
    pub const fn from_raw(raw: i16) -> Self {
        Self(raw)
    }

    /// The raw Q8.8 bit pattern.
    #[must_use]
    pub const fn raw(self) -> i16 {
        self.0
    }

    /// Convert from a floating-point value, rounding to nearest-even and
    /// saturating to the representable range. Used by callers assembling
    /// test fixtures and reference tensors; the engine itself never
    /// touches floating point.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * 256.0).round_ties_even();
        let clamped = scaled.clamp(f64::from(i16::MIN), f64::from(i16::MAX));
        #[allow(clippy::cast_possible_truncation)]
        Self(clamped as i16)
    }

    /// Convert to a floating-point value for diagnostics and tolerance
    /// checks in tests.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 256.0
    }
}

impl fmt::Debug for Q8_8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q8_8({:.6})", self.to_f64())
    }
}
