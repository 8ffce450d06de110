//! Fixed-point arithmetic kernel: Q8.8 and Q16.16 scalars, the MAC
//! primitives that must stay bit-identical between the accelerator path
//! and the golden reference, and the 256-bit lane packing used by the
//! backing store.

mod activation;
mod q16_16;
mod q8_8;
mod word256;

pub use activation::{activate, ActivationMode};
pub use q16_16::Q16_16;
pub use q8_8::Q8_8;
pub use word256::Word256;

/// `a * b`, widened into Q16.16 then narrowed back to Q8.8 with
/// round-to-nearest-even and saturation.
#[must_use]
pub fn mul_q8_8(a: Q8_8, b: Q8_8) -> Q8_8 {
    Q16_16::widen_mul(a, b).narrow()
}

/// `acc + widen(a * b)`, saturating in the Q16.16 domain.
#[must_use]
pub fn mac(acc: Q16_16, a: Q8_8, b: Q8_8) -> Q16_16 {
    acc.mac(a, b)
}

/// Narrow a Q16.16 accumulator to Q8.8 with round-to-nearest-even and
/// saturation.
#[must_use]
pub fn narrow(x: Q16_16) -> Q8_8 {
    x.narrow()
}

/// `narrow(acc * scale + bias)` — the fused-affine step applied once per
/// output element on the last IC tile. Kept as a single primitive (rather
/// than `narrow(acc.affine(...))`) so there is exactly one rounding
/// operation between the full-precision accumulator and the Q8.8 result,
/// matching the "narrow-once-at-the-end" contract the decomposability
/// invariant depends on.
#[must_use]
pub fn narrow_affine(acc: Q16_16, scale: Q8_8, bias: Q8_8) -> Q8_8 {
    // acc carries 16 fractional bits, scale 8: their exact product carries
    // 24. Promote bias (8 fractional bits) to the same 24-bit scale before
    // summing, then narrow the 24-bit sum straight to Q8.8 (8 fractional
    // bits) in one round-to-nearest-even + saturate step.
    let product_24 = i64::from(acc.raw()) * i64::from(scale.raw());
    let bias_24 = i64::from(bias.raw()) << 16;
    let sum_24 = product_24 + bias_24;
    narrow_from_q8_24(sum_24)
}

/// Round-to-nearest-even + saturate a scale-2^24 intermediate down to
/// Q8.8 (scale 2^8), sharing the exact rounding rule [`narrow`] uses.
fn narrow_from_q8_24(sum_24: i64) -> Q8_8 {
    let rounded = q16_16::round_div_pow2_even(sum_24, 16);
    #[allow(clippy::cast_possible_truncation)]
    let clamped = rounded.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16;
    Q8_8::from_raw(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_identity() {
        let one = Q8_8::from_f64(1.0);
        let v = Q8_8::from_f64(0.5);
        assert_eq!(mul_q8_8(one, v), v);
    }

    #[test]
    fn narrow_affine_identity_scale_zero_bias() {
        let acc = Q16_16::widen_mul(Q8_8::from_f64(2.0), Q8_8::from_f64(3.0));
        let scale = Q8_8::from_f64(1.0);
        let bias = Q8_8::from_f64(0.0);
        assert_eq!(narrow_affine(acc, scale, bias), narrow(acc));
    }
}
