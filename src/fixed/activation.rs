//! Fused activation applied once per output element, on the last IC tile.

use super::q16_16::Q16_16;
use super::q8_8::Q8_8;

/// Activation function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// Identity — pass the narrowed value through unchanged.
    Linear,
    /// Rectified linear unit: negative inputs clamp to zero.
    Relu,
    /// Leaky ReLU with a fixed ~0.1 negative slope, contractually defined
    /// as `(x * 13) >> 7` in the Q16.16 domain rather than literal 0.1.
    Leaky,
}

/// Apply the activation contract to an already-narrowed Q8.8 value.
#[must_use]
pub fn activate(x: Q8_8, mode: ActivationMode) -> Q8_8 {
    match mode {
        ActivationMode::Linear => x,
        ActivationMode::Relu => {
            if x.raw() < 0 {
                Q8_8::ZERO
            } else {
                x
            }
        }
        ActivationMode::Leaky => {
            if x.raw() < 0 {
                leaky_negative_branch(x)
            } else {
                x
            }
        }
    }
}

/// `narrow((x * 13) >> 7)` computed without an intermediate rounding step:
/// promoting `x` (Q8.8, scale 256) into the Q16.16 domain (scale 65536)
/// multiplies its raw value by 256; multiplying by 13 and shifting right
/// by 7 divides evenly (`256*13 == 3328 == 128*26`), so the whole
/// computation collapses to `raw(x) * 26` in the Q16.16 domain before the
/// single contractual narrow.
fn leaky_negative_branch(x: Q8_8) -> Q8_8 {
    let widened = i64::from(x.raw()) * 26;
    Q16_16::saturating_from_i64(widened).narrow()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negative() {
        assert_eq!(activate(Q8_8::from_raw(-256), ActivationMode::Relu).raw(), 0);
        assert_eq!(
            activate(Q8_8::from_raw(256), ActivationMode::Relu).raw(),
            256
        );
    }

    #[test]
    fn leaky_matches_exact_fraction() {
        // v = -256 (i.e. -1.0); exact v*13/128 = -26.0 -> raw -26*256/... check via formula
        let v = Q8_8::from_raw(-256);
        let got = activate(v, ActivationMode::Leaky);
        // raw(x)*26 = -256*26 = -6656 in Q16.16; narrow divides by 256 -> -26 exactly.
        assert_eq!(got.raw(), -26);
    }

    #[test]
    fn linear_is_identity() {
        let v = Q8_8::from_raw(-12345);
        assert_eq!(activate(v, ActivationMode::Linear), v);
    }
}
