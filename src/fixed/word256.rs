//! Bit-exact 256-bit packed memory word: 16 consecutive Q8.8 elements,
//! element `i` occupying bit range `[i*16+15 : i*16]`, little-element
//! first.

use super::q8_8::Q8_8;
use crate::constants::WORD_LANES;

/// An opaque 256-bit backing-store word. Never exposes the raw byte
/// array at the public API boundary — only [`Word256::get`] /
/// [`Word256::set`] on 16-bit lanes, so a caller cannot accidentally
/// pack elements in the wrong lane or endianness.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Word256([u8; 32]);

impl Word256 {
    /// Number of Q8.8 lanes packed into one word.
    pub const LANES: usize = WORD_LANES;

    /// The all-zero word.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Read lane `i`'s Q8.8 element, bits `[i*16+15 : i*16]`.
    #[must_use]
    pub fn get(&self, lane: usize) -> Q8_8 {
        assert!(lane < Self::LANES, "lane {lane} out of range");
        let off = lane * 2;
        Q8_8::from_raw(i16::from_le_bytes([self.0[off], self.0[off + 1]]))
    }

    /// Write lane `i`'s Q8.8 element, bits `[i*16+15 : i*16]`.
    pub fn set(&mut self, lane: usize, value: Q8_8) {
        assert!(lane < Self::LANES, "lane {lane} out of range");
        let off = lane * 2;
        let bytes = value.raw().to_le_bytes();
        self.0[off] = bytes[0];
        self.0[off + 1] = bytes[1];
    }

    /// Pack 16 Q8.8 elements into one word, element 0 in the lowest bits.
    #[must_use]
    pub fn pack16(elems: &[Q8_8; 16]) -> Self {
        let mut word = Self::zero();
        for (lane, &elem) in elems.iter().enumerate() {
            word.set(lane, elem);
        }
        word
    }

    /// Inverse of [`Word256::pack16`].
    #[must_use]
    pub fn unpack16(&self) -> [Q8_8; 16] {
        let mut out = [Q8_8::ZERO; 16];
        for (lane, slot) in out.iter_mut().enumerate() {
            *slot = self.get(lane);
        }
        out
    }

}

impl Default for Word256 {
    fn default() -> Self {
        Self::zero()
    }
}

impl core::fmt::Debug for Word256 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.unpack16()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips() {
        let mut elems = [Q8_8::ZERO; 16];
        for (i, e) in elems.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            {
                *e = Q8_8::from_raw((i as i16) * 7 - 50);
            }
        }
        let word = Word256::pack16(&elems);
        assert_eq!(word.unpack16(), elems);
    }

    #[test]
    fn lanes_occupy_disjoint_bit_ranges() {
        let mut word = Word256::zero();
        word.set(3, Q8_8::from_raw(-1));
        for lane in 0..16 {
            if lane == 3 {
                assert_eq!(word.get(lane).raw(), -1);
            } else {
                assert_eq!(word.get(lane).raw(), 0);
            }
        }
    }
}
