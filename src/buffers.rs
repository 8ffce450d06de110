//! On-chip working set: fixed-size buffers, allocated once when an
//! [`crate::Engine`] is constructed and reused for every tile of every
//! subsequent invocation. Nothing in this module allocates after
//! `Engine::new` returns.

use crate::constants::{K_MAX, MAX_STRIDE};
use crate::fixed::{Q16_16, Q8_8};

/// Tile edge lengths an [`crate::Engine`] is built for. Defaults to the
/// data model's `TILE = 16` for every axis; tests shrink these to check
/// the decomposability invariant (the schedule changes, the numbers
/// don't).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    /// Output-tile row edge.
    pub tile_h: usize,
    /// Output-tile column edge.
    pub tile_w: usize,
    /// Input-channel tile depth.
    pub tile_ic: usize,
    /// Output-channel tile depth.
    pub tile_oc: usize,
}

impl TileConfig {
    /// Input-cache edge length covering a `tile_h`/`tile_w` output tile at
    /// the maximum stride with the maximum kernel size.
    #[must_use]
    pub const fn cache_h(&self) -> usize {
        self.tile_h * MAX_STRIDE + K_MAX - 1
    }

    /// See [`TileConfig::cache_h`].
    #[must_use]
    pub const fn cache_w(&self) -> usize {
        self.tile_w * MAX_STRIDE + K_MAX - 1
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_h: crate::constants::TILE_H,
            tile_w: crate::constants::TILE_W,
            tile_ic: crate::constants::TILE_IC,
            tile_oc: crate::constants::TILE_OC,
        }
    }
}

/// `[TILE_IC][CACHE_H][CACHE_W]` input cache, live across every OC tile of
/// one IC tile.
#[derive(Clone)]
pub struct InputCache {
    data: Vec<Q8_8>,
    tile_ic: usize,
    cache_h: usize,
    cache_w: usize,
}

impl InputCache {
    pub(crate) fn new(config: &TileConfig) -> Self {
        let (cache_h, cache_w) = (config.cache_h(), config.cache_w());
        Self {
            data: vec![Q8_8::ZERO; config.tile_ic * cache_h * cache_w],
            tile_ic: config.tile_ic,
            cache_h,
            cache_w,
        }
    }

    fn index(&self, ic: usize, row: usize, col: usize) -> usize {
        debug_assert!(ic < self.tile_ic && row < self.cache_h && col < self.cache_w);
        (ic * self.cache_h + row) * self.cache_w + col
    }

    pub(crate) fn set(&mut self, ic: usize, row: usize, col: usize, value: Q8_8) {
        let idx = self.index(ic, row, col);
        self.data[idx] = value;
    }

    pub(crate) fn get(&self, ic: usize, row: usize, col: usize) -> Q8_8 {
        self.data[self.index(ic, row, col)]
    }
}

/// `[TILE_OC][TILE_IC][K_MAX][K_MAX]` weight cache for one OC tile.
#[derive(Clone)]
pub struct WeightCache {
    data: Vec<Q8_8>,
    tile_ic: usize,
}

impl WeightCache {
    pub(crate) fn new(config: &TileConfig) -> Self {
        Self {
            data: vec![Q8_8::ZERO; config.tile_oc * config.tile_ic * K_MAX * K_MAX],
            tile_ic: config.tile_ic,
        }
    }

    fn index(&self, oc: usize, ic: usize, ky: usize, kx: usize) -> usize {
        ((oc * self.tile_ic + ic) * K_MAX + ky) * K_MAX + kx
    }

    pub(crate) fn set(&mut self, oc: usize, ic: usize, ky: usize, kx: usize, value: Q8_8) {
        let idx = self.index(oc, ic, ky, kx);
        self.data[idx] = value;
    }

    pub(crate) fn get(&self, oc: usize, ic: usize, ky: usize, kx: usize) -> Q8_8 {
        self.data[self.index(oc, ic, ky, kx)]
    }
}

/// `[TILE_OC][TILE_H][TILE_W]` accumulator, initialized on the first IC
/// tile of an (row, col) tile and finalized on the last.
#[derive(Clone)]
pub struct AccumBuffer {
    data: Vec<Q16_16>,
    tile_h: usize,
    tile_w: usize,
}

impl AccumBuffer {
    pub(crate) fn new(config: &TileConfig) -> Self {
        Self {
            data: vec![Q16_16::ZERO; config.tile_oc * config.tile_h * config.tile_w],
            tile_h: config.tile_h,
            tile_w: config.tile_w,
        }
    }

    fn index(&self, oc: usize, row: usize, col: usize) -> usize {
        (oc * self.tile_h + row) * self.tile_w + col
    }

    pub(crate) fn clear(&mut self, oc_count: usize, curr_h: usize, curr_w: usize) {
        for oc in 0..oc_count {
            for row in 0..curr_h {
                for col in 0..curr_w {
                    let idx = self.index(oc, row, col);
                    self.data[idx] = Q16_16::ZERO;
                }
            }
        }
    }

    pub(crate) fn get(&self, oc: usize, row: usize, col: usize) -> Q16_16 {
        self.data[self.index(oc, row, col)]
    }

    pub(crate) fn set(&mut self, oc: usize, row: usize, col: usize, value: Q16_16) {
        let idx = self.index(oc, row, col);
        self.data[idx] = value;
    }
}

/// `[MAX_OC_STEPS][TILE_OC][TILE_H][TILE_W]` partial sums held across IC
/// tiles, one slot per OC tile, within the lifetime of one (row, col)
/// tile.
#[derive(Clone)]
pub struct PsumBuffer {
    data: Vec<Q16_16>,
    tile_oc: usize,
    tile_h: usize,
    tile_w: usize,
    max_oc_steps: usize,
}

impl PsumBuffer {
    pub(crate) fn new(config: &TileConfig, max_oc_steps: usize) -> Self {
        Self {
            data: vec![Q16_16::ZERO; max_oc_steps * config.tile_oc * config.tile_h * config.tile_w],
            tile_oc: config.tile_oc,
            tile_h: config.tile_h,
            tile_w: config.tile_w,
            max_oc_steps,
        }
    }

    /// Largest `ceil(OC / TILE_OC)` this buffer has room for.
    pub(crate) const fn capacity_steps(&self) -> usize {
        self.max_oc_steps
    }

    fn index(&self, step: usize, oc: usize, row: usize, col: usize) -> usize {
        debug_assert!(step < self.max_oc_steps);
        ((step * self.tile_oc + oc) * self.tile_h + row) * self.tile_w + col
    }

    pub(crate) fn save(&mut self, step: usize, accum: &AccumBuffer, oc_count: usize, curr_h: usize, curr_w: usize) {
        for oc in 0..oc_count {
            for row in 0..curr_h {
                for col in 0..curr_w {
                    let idx = self.index(step, oc, row, col);
                    self.data[idx] = accum.get(oc, row, col);
                }
            }
        }
    }

    pub(crate) fn load(&self, step: usize, accum: &mut AccumBuffer, oc_count: usize, curr_h: usize, curr_w: usize) {
        for oc in 0..oc_count {
            for row in 0..curr_h {
                for col in 0..curr_w {
                    let idx = self.index(step, oc, row, col);
                    accum.set(oc, row, col, self.data[idx]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tile_config_matches_data_model() {
        let config = TileConfig::default();
        assert_eq!(config.cache_h(), 35);
        assert_eq!(config.cache_w(), 35);
    }

    #[test]
    fn psum_round_trips_through_accum() {
        let config = TileConfig {
            tile_h: 4,
            tile_w: 4,
            tile_ic: 4,
            tile_oc: 4,
        };
        let mut accum = AccumBuffer::new(&config);
        accum.set(0, 0, 0, Q16_16::from_raw(42));
        let mut psum = PsumBuffer::new(&config, 2);
        psum.save(0, &accum, 4, 4, 4);
        let mut restored = AccumBuffer::new(&config);
        psum.load(0, &mut restored, 4, 4, 4);
        assert_eq!(restored.get(0, 0, 0), Q16_16::from_raw(42));
    }
}
