//! Tile scheduler: enumerates the `(tr, tc, ti, to)` iteration space in
//! the canonical row-outer, col, IC-outer, OC-inner order, and computes
//! per-tile geometry.

use crate::buffers::TileConfig;
use crate::job::JobParams;

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Per-tile geometry: where this tile lands in the output, and the input
/// window it needs (which may start before row/column zero — zero
/// padding covers the rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Output row tile index.
    pub tr: usize,
    /// Output column tile index.
    pub tc: usize,
    /// Input-channel tile index.
    pub ti: usize,
    /// Output-channel tile index.
    pub to: usize,
    /// First output row of this tile.
    pub r_start: usize,
    /// First output column of this tile.
    pub c_start: usize,
    /// Output rows in this tile, clipped to the output boundary.
    pub curr_h: usize,
    /// Output columns in this tile, clipped to the output boundary.
    pub curr_w: usize,
    /// Input window height needed to produce `curr_h` output rows.
    pub tile_in_h: usize,
    /// Input window width needed to produce `curr_w` output columns.
    pub tile_in_w: usize,
    /// First input row of the window (may be negative: zero padding).
    pub h_base: i64,
    /// First input column of the window (may be negative: zero padding).
    pub w_base: i64,
    /// First input channel of this IC tile.
    pub ic_base: usize,
    /// Valid input channels in this IC tile, clipped to `IC`.
    pub ic_valid: usize,
    /// First output channel of this OC tile.
    pub oc_base: usize,
    /// Valid output channels in this OC tile, clipped to `OC`.
    pub oc_valid: usize,
    /// `true` on the first IC tile of this (row, col, OC) tile.
    pub is_first_ic: bool,
    /// `true` on the last IC tile of this (row, col, OC) tile.
    pub is_last_ic: bool,
}

/// Enumerates `(tr, tc, ti, to)` row-outer, col, IC-outer, OC-inner, as
/// required by the IC-outer / OC-inner contract (the input tile is
/// fetched once per IC tile and reused across every OC tile).
pub struct Schedule {
    config: TileConfig,
    params: JobParams,
    oh: usize,
    ow: usize,
    row_tiles: usize,
    col_tiles: usize,
    ic_tiles: usize,
    oc_tiles: usize,
}

impl Schedule {
    /// Build a schedule over `params`'s pre-pool output shape using
    /// `config`'s tile edges.
    #[must_use]
    pub fn new(config: TileConfig, params: JobParams, oh: usize, ow: usize) -> Self {
        let row_tiles = div_ceil(oh, config.tile_h);
        let col_tiles = div_ceil(ow, config.tile_w);
        let ic_tiles = div_ceil(params.ic, config.tile_ic);
        let oc_tiles = div_ceil(params.oc, config.tile_oc);
        Self {
            config,
            params,
            oh,
            ow,
            row_tiles,
            col_tiles,
            ic_tiles,
            oc_tiles,
        }
    }

    /// Number of `(tr, tc)` row/column tiles.
    #[must_use]
    pub const fn row_col_tiles(&self) -> (usize, usize) {
        (self.row_tiles, self.col_tiles)
    }

    /// Number of IC tiles.
    #[must_use]
    pub const fn ic_tiles(&self) -> usize {
        self.ic_tiles
    }

    /// Number of OC tiles.
    #[must_use]
    pub const fn oc_tiles(&self) -> usize {
        self.oc_tiles
    }

    /// Geometry for a specific `(tr, tc, ti, to)` tuple.
    #[must_use]
    pub fn geometry(&self, tr: usize, tc: usize, ti: usize, to: usize) -> TileGeometry {
        let r_start = tr * self.config.tile_h;
        let c_start = tc * self.config.tile_w;
        let curr_h = (self.oh - r_start).min(self.config.tile_h);
        let curr_w = (self.ow - c_start).min(self.config.tile_w);

        let k = self.params.k;
        let s = self.params.s;
        let p = self.params.p;
        let tile_in_h = curr_h * s + k - 1;
        let tile_in_w = curr_w * s + k - 1;
        #[allow(clippy::cast_possible_wrap)]
        let h_base = (r_start * s) as i64 - p as i64;
        #[allow(clippy::cast_possible_wrap)]
        let w_base = (c_start * s) as i64 - p as i64;

        let ic_base = ti * self.config.tile_ic;
        let ic_valid = (self.params.ic - ic_base).min(self.config.tile_ic);

        let oc_base = to * self.config.tile_oc;
        let oc_valid = (self.params.oc - oc_base).min(self.config.tile_oc);

        TileGeometry {
            tr,
            tc,
            ti,
            to,
            r_start,
            c_start,
            curr_h,
            curr_w,
            tile_in_h,
            tile_in_w,
            h_base,
            w_base,
            ic_base,
            ic_valid,
            oc_base,
            oc_valid,
            is_first_ic: ti == 0,
            is_last_ic: ti + 1 == self.ic_tiles,
        }
    }

    /// Iterate every `(tr, tc, ti, to)` tuple in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = TileGeometry> + '_ {
        (0..self.row_tiles).flat_map(move |tr| {
            (0..self.col_tiles).flat_map(move |tc| {
                (0..self.ic_tiles).flat_map(move |ti| {
                    (0..self.oc_tiles).map(move |to| self.geometry(tr, tc, ti, to))
                })
            })
        })
    }
}
