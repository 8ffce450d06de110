//! Shared tensor-construction helpers for the integration test suite.
//! Not itself a test binary — included via `mod common;` in each file
//! under `tests/`.
#![allow(clippy::pedantic, clippy::nursery)]
#![allow(dead_code)]

use conv_tile_engine::{Q8_8, Word256};

/// Whole words needed to hold `elements` Q8.8 values.
#[must_use]
pub fn words_for(elements: usize) -> usize {
    (elements + Word256::LANES - 1) / Word256::LANES
}

fn pack(n: usize, mut value_at: impl FnMut(usize) -> Q8_8) -> Vec<Word256> {
    let mut words = vec![Word256::zero(); words_for(n)];
    for i in 0..n {
        words[i / Word256::LANES].set(i % Word256::LANES, value_at(i));
    }
    words
}

/// Deterministic input fixture: `x[i] = (i mod 100) / 100`.
#[must_use]
pub fn build_input(ic: usize, h: usize, w: usize) -> Vec<Word256> {
    pack(ic * h * w, |i| Q8_8::from_f64((i % 100) as f64 / 100.0))
}

/// Deterministic weight fixture: `w[i] = ((i mod 7) - 3) / 10`.
#[must_use]
pub fn build_weights(oc: usize, ic: usize, k: usize) -> Vec<Word256> {
    pack(oc * ic * k * k, |i| Q8_8::from_f64(((i % 7) as f64 - 3.0) / 10.0))
}

/// A uniform `(scale, bias)` fused-affine fixture across every channel.
#[must_use]
pub fn build_affine(oc: usize, scale: f64, bias: f64) -> Vec<Word256> {
    pack(2 * oc, |i| {
        if i % 2 == 0 {
            Q8_8::from_f64(scale)
        } else {
            Q8_8::from_f64(bias)
        }
    })
}

/// Read element `i` of a tensor packed by [`pack`]/[`build_input`]/etc.
#[must_use]
pub fn read_element(words: &[Word256], i: usize) -> Q8_8 {
    words[i / Word256::LANES].get(i % Word256::LANES)
}

/// Largest absolute difference between two Q8.8 tensors of `len` elements
/// viewed as floating point, matching the tolerance check used across the
/// end-to-end scenarios.
#[must_use]
pub fn max_abs_diff(a: &[Word256], b: &[Word256], len: usize) -> f64 {
    (0..len)
        .map(|i| (read_element(a, i).to_f64() - read_element(b, i).to_f64()).abs())
        .fold(0.0_f64, f64::max)
}
