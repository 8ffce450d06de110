//! Fetch stage: fills the input and weight caches from the backing store
//! and serializes them into the packed word streams the Execute stage
//! consumes, in the streaming orders fixed at the data-model level.

use crate::buffers::{InputCache, WeightCache};
use crate::fixed::{Q8_8, Word256};
use crate::schedule::TileGeometry;
use crate::tensor::{InputView, WeightView};

/// Fill the input cache for tile `(tr, tc, ti)`: zero each cache row, then
/// scatter whatever part of it lands inside the real input. Out-of-range
/// rows, columns, or input channels are left at the zero a fresh row was
/// initialized to — the engine's sole zero-padding rule.
pub fn fill_input_cache(cache: &mut InputCache, input: &InputView, geom: &TileGeometry, tile_ic: usize) {
    for ic_local in 0..tile_ic {
        let ic = geom.ic_base + ic_local;
        for i in 0..geom.tile_in_h {
            let row = geom.h_base + i as i64;
            for j in 0..geom.tile_in_w {
                cache.set(ic_local, i, j, Q8_8::ZERO);
            }
            let row_in_bounds =
                row >= 0 && (row as usize) < input.height() && ic < input.ic_count();
            if !row_in_bounds {
                continue;
            }
            #[allow(clippy::cast_sign_loss)]
            let row_idx = row as usize;
            for j in 0..geom.tile_in_w {
                let col = geom.w_base + j as i64;
                if col < 0 || (col as usize) >= input.width() {
                    continue;
                }
                #[allow(clippy::cast_sign_loss)]
                let col_idx = col as usize;
                cache.set(ic_local, i, j, input.get(ic, row_idx, col_idx));
            }
        }
    }
}

/// Fill the weight cache for OC tile `geom.to` within IC tile `geom.ti`.
/// Slots with `oc_local >= oc_valid` or `ic_local >= ic_valid` are left
/// untouched; the Execute stage still consumes them (streamed as
/// arbitrary bits) but the Write stage discards their contribution.
pub fn fill_weight_cache(
    cache: &mut WeightCache,
    weights: &WeightView,
    geom: &TileGeometry,
    tile_oc: usize,
    tile_ic: usize,
    k: usize,
) {
    for oc_local in 0..tile_oc.min(geom.oc_valid) {
        let oc = geom.oc_base + oc_local;
        for ic_local in 0..tile_ic.min(geom.ic_valid) {
            let ic = geom.ic_base + ic_local;
            for ky in 0..k {
                for kx in 0..k {
                    cache.set(oc_local, ic_local, ky, kx, weights.get(oc, ic, ky, kx));
                }
            }
        }
    }
}

/// Serialize the input cache in the Execute stage's expected order: outer
/// `ky, kx`, then `i, j`; each word packs `TILE_IC` lanes.
#[must_use]
pub fn stream_input_words(
    cache: &InputCache,
    geom: &TileGeometry,
    k: usize,
    s: usize,
    tile_ic: usize,
) -> Vec<Word256> {
    let mut words = Vec::with_capacity(k * k * geom.curr_h * geom.curr_w);
    for ky in 0..k {
        for kx in 0..k {
            for i in 0..geom.curr_h {
                for j in 0..geom.curr_w {
                    let mut elems = [Q8_8::ZERO; Word256::LANES];
                    for ic_local in 0..tile_ic {
                        elems[ic_local] = cache.get(ic_local, i * s + ky, j * s + kx);
                    }
                    words.push(Word256::pack16(&elems));
                }
            }
        }
    }
    words
}

/// Serialize the weight cache in the Execute stage's expected order:
/// outer `oc`, then `ky, kx`; each word packs `TILE_IC` lanes. Always
/// `TILE_OC * K * K` words, regardless of `oc_valid`.
#[must_use]
pub fn stream_weight_words(cache: &WeightCache, k: usize, tile_oc: usize, tile_ic: usize) -> Vec<Word256> {
    let mut words = Vec::with_capacity(tile_oc * k * k);
    for oc_local in 0..tile_oc {
        for ky in 0..k {
            for kx in 0..k {
                let mut elems = [Q8_8::ZERO; Word256::LANES];
                for ic_local in 0..tile_ic {
                    elems[ic_local] = cache.get(oc_local, ic_local, ky, kx);
                }
                words.push(Word256::pack16(&elems));
            }
        }
    }
    words
}
