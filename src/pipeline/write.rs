//! Write stage: demultiplexes Execute's per-tile output words, then places
//! each row into the backing store with the edge-aware read-modify-write
//! discipline, optionally after a 2x2 stride-2 max-pool reduction.
//!
//! Phase-separating read-edge, pack, and burst-write (rather than
//! interleaving them) is what lets a hardware realization infer long
//! unidirectional bursts; here it just keeps the RMW logic in one place.

use crate::fixed::{Q8_8, Word256};
use crate::schedule::TileGeometry;
use crate::tensor::{word_lane, OutputView};

/// Demultiplex one `(tr, tc, to)` tile's output words into a flat
/// `[tile_oc][curr_h][curr_w]` buffer of Q8.8 elements.
#[must_use]
pub fn demux_tile(words: &[Word256], geom: &TileGeometry, tile_oc: usize) -> Vec<Q8_8> {
    debug_assert_eq!(words.len(), geom.curr_h * geom.curr_w);
    let mut buf = vec![Q8_8::ZERO; tile_oc * geom.curr_h * geom.curr_w];
    let mut idx = 0;
    for i in 0..geom.curr_h {
        for j in 0..geom.curr_w {
            let lanes = words[idx].unpack16();
            idx += 1;
            for oc_local in 0..tile_oc.min(Word256::LANES) {
                buf[(oc_local * geom.curr_h + i) * geom.curr_w + j] = lanes[oc_local];
            }
        }
    }
    buf
}

/// Write one contiguous row of `row.len()` elements starting at flat
/// output index `base`. Words fully covered by the row are
/// zero-initialized; the first/last touched word is read back from the
/// backing store only when the row doesn't start/end on a word boundary.
fn write_row(output: &mut OutputView, base: usize, row: &[Q8_8]) {
    let len = row.len();
    if len == 0 {
        return;
    }
    let end_idx = base + len - 1;
    let (first_word, start_slot) = word_lane(base);
    let (last_word, end_slot) = word_lane(end_idx);

    if first_word == last_word {
        let mut word = if start_slot != 0 || end_slot != Word256::LANES - 1 {
            output.read_word(first_word)
        } else {
            Word256::zero()
        };
        for (offset, &value) in row.iter().enumerate() {
            word.set(start_slot + offset, value);
        }
        output.write_word(first_word, word);
        return;
    }

    let mut first = if start_slot != 0 {
        output.read_word(first_word)
    } else {
        Word256::zero()
    };
    let first_count = Word256::LANES - start_slot;
    for offset in 0..first_count {
        first.set(start_slot + offset, row[offset]);
    }
    output.write_word(first_word, first);

    for word_idx in (first_word + 1)..last_word {
        let local_base = first_count + (word_idx - first_word - 1) * Word256::LANES;
        let mut word = Word256::zero();
        for (lane, &value) in row[local_base..local_base + Word256::LANES].iter().enumerate() {
            word.set(lane, value);
        }
        output.write_word(word_idx, word);
    }

    let mut last = if end_slot != Word256::LANES - 1 {
        output.read_word(last_word)
    } else {
        Word256::zero()
    };
    let last_count = end_slot + 1;
    let last_base = len - last_count;
    for (offset, &value) in row[last_base..].iter().enumerate() {
        last.set(offset, value);
    }
    output.write_word(last_word, last);
}

/// Place one `(tr, tc, to)` tile's demultiplexed output into the backing
/// store at full (pre-pool) resolution. `total_oc` is the job's `OC`;
/// channels at or beyond it (padding within the last OC tile) are
/// dropped, never written.
pub fn place_tile(
    output: &mut OutputView,
    buf: &[Q8_8],
    geom: &TileGeometry,
    tile_oc: usize,
    total_oc: usize,
    oh: usize,
    ow: usize,
) {
    for oc_local in 0..tile_oc.min(geom.oc_valid) {
        let global_oc = geom.oc_base + oc_local;
        if global_oc >= total_oc {
            continue;
        }
        for i in 0..geom.curr_h {
            let base = (global_oc * oh + geom.r_start + i) * ow + geom.c_start;
            let row = &buf[(oc_local * geom.curr_h + i) * geom.curr_w..][..geom.curr_w];
            write_row(output, base, row);
        }
    }
}

/// Reduce `buf` with a 2x2 stride-2 max-pool and place the pooled tile
/// into the backing store at half resolution.
pub fn place_tile_pooled(
    output: &mut OutputView,
    buf: &[Q8_8],
    geom: &TileGeometry,
    tile_oc: usize,
    total_oc: usize,
    pooled_oh: usize,
    pooled_ow: usize,
) {
    let pooled_h = geom.curr_h / 2;
    let pooled_w = geom.curr_w / 2;
    let mut row_buf = vec![Q8_8::ZERO; pooled_w];

    for oc_local in 0..tile_oc.min(geom.oc_valid) {
        let global_oc = geom.oc_base + oc_local;
        if global_oc >= total_oc {
            continue;
        }
        for i in 0..pooled_h {
            for (j, slot) in row_buf.iter_mut().enumerate() {
                let row0 = (oc_local * geom.curr_h + 2 * i) * geom.curr_w;
                let row1 = (oc_local * geom.curr_h + 2 * i + 1) * geom.curr_w;
                let a = buf[row0 + 2 * j];
                let b = buf[row0 + 2 * j + 1];
                let c = buf[row1 + 2 * j];
                let d = buf[row1 + 2 * j + 1];
                *slot = a.max(b).max(c).max(d);
            }
            let base = (global_oc * pooled_oh + geom.r_start / 2 + i) * pooled_ow + geom.c_start / 2;
            write_row(output, base, &row_buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom_for(r_start: usize, c_start: usize, curr_h: usize, curr_w: usize) -> TileGeometry {
        TileGeometry {
            tr: 0,
            tc: 0,
            ti: 0,
            to: 0,
            r_start,
            c_start,
            curr_h,
            curr_w,
            tile_in_h: curr_h,
            tile_in_w: curr_w,
            h_base: 0,
            w_base: 0,
            ic_base: 0,
            ic_valid: 1,
            oc_base: 0,
            oc_valid: 1,
            is_first_ic: true,
            is_last_ic: true,
        }
    }

    #[test]
    fn write_row_splits_across_word_boundary() {
        let mut words = vec![Word256::zero(); 2];
        {
            let mut view = OutputView::new(&mut words);
            let row: Vec<Q8_8> = (0..20).map(|i| Q8_8::from_raw(i)).collect();
            write_row(&mut view, 10, &row);
        }
        assert_eq!(words[0].get(10).raw(), 0);
        assert_eq!(words[0].get(15).raw(), 5);
        assert_eq!(words[1].get(0).raw(), 6);
        assert_eq!(words[1].get(3).raw(), 9);
    }

    #[test]
    fn write_row_preserves_untouched_lanes_in_shared_word() {
        let mut words = vec![Word256::zero(); 1];
        words[0].set(0, Q8_8::from_raw(99));
        {
            let mut view = OutputView::new(&mut words);
            let row = [Q8_8::from_raw(1), Q8_8::from_raw(2)];
            write_row(&mut view, 1, &row);
        }
        assert_eq!(words[0].get(0).raw(), 99);
        assert_eq!(words[0].get(1).raw(), 1);
        assert_eq!(words[0].get(2).raw(), 2);
    }

    #[test]
    fn pool_reduces_2x2_blocks_to_max() {
        let geom = geom_for(0, 0, 2, 2);
        let buf = [
            Q8_8::from_raw(1),
            Q8_8::from_raw(5),
            Q8_8::from_raw(3),
            Q8_8::from_raw(2),
        ];
        let mut out = vec![Word256::zero(); 1];
        {
            let mut view = OutputView::new(&mut out);
            place_tile_pooled(&mut view, &buf, &geom, 1, 1, 1, 1);
        }
        assert_eq!(out[0].get(0).raw(), 5);
    }
}
