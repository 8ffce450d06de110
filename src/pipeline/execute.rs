//! Execute stage: consumes the Fetch stage's input and weight word
//! streams, runs the MAC sweep into the accumulator (saving or loading
//! partial sums across IC tiles), and on the last IC tile applies the
//! fused affine and activation and emits output words.

use crate::buffers::{AccumBuffer, PsumBuffer};
use crate::fixed::{self, ActivationMode, Q8_8, Word256};
use crate::schedule::TileGeometry;
use crate::tensor::AffineView;

/// Run one `(tr, tc, ti, to)` tile through the MAC array. Returns the
/// packed output words for `(tr, tc, to)` when this was the last IC tile,
/// `None` otherwise (the partial sum was saved instead).
#[allow(clippy::too_many_arguments)]
pub fn execute_tile(
    accum: &mut AccumBuffer,
    psum: &mut PsumBuffer,
    affine: &AffineView,
    geom: &TileGeometry,
    input_words: &[Word256],
    weight_words: &[Word256],
    k: usize,
    tile_oc: usize,
    tile_ic: usize,
    activation: ActivationMode,
) -> Option<Vec<Word256>> {
    log::trace!(
        "execute tile tr={} tc={} ti={} to={}",
        geom.tr,
        geom.tc,
        geom.ti,
        geom.to
    );

    if geom.is_first_ic {
        log::trace!("clearing accumulator (first ic tile)");
        accum.clear(tile_oc, geom.curr_h, geom.curr_w);
    } else {
        log::trace!("loading partial sum from step {}", geom.to);
        psum.load(geom.to, accum, tile_oc, geom.curr_h, geom.curr_w);
    }

    let mut scale_buf = vec![Q8_8::ZERO; tile_oc];
    let mut bias_buf = vec![Q8_8::ZERO; tile_oc];
    if geom.is_last_ic {
        for oc_local in 0..tile_oc.min(geom.oc_valid) {
            let oc = geom.oc_base + oc_local;
            scale_buf[oc_local] = affine.scale(oc);
            bias_buf[oc_local] = affine.bias(oc);
        }
    }

    debug_assert_eq!(weight_words.len(), tile_oc * k * k);
    let weight_regs: Vec<[Q8_8; Word256::LANES]> =
        weight_words.iter().map(Word256::unpack16).collect();

    debug_assert_eq!(input_words.len(), k * k * geom.curr_h * geom.curr_w);
    let mut input_idx = 0;
    for ky in 0..k {
        for kx in 0..k {
            for i in 0..geom.curr_h {
                for j in 0..geom.curr_w {
                    let in_vec = input_words[input_idx].unpack16();
                    input_idx += 1;
                    for oc_local in 0..tile_oc {
                        let w_vec = &weight_regs[(oc_local * k + ky) * k + kx];
                        let mut acc = accum.get(oc_local, i, j);
                        for ic_local in 0..tile_ic {
                            acc = fixed::mac(acc, w_vec[ic_local], in_vec[ic_local]);
                        }
                        accum.set(oc_local, i, j, acc);
                    }
                }
            }
        }
    }

    if !geom.is_last_ic {
        psum.save(geom.to, accum, tile_oc, geom.curr_h, geom.curr_w);
        return None;
    }

    log::trace!("finalizing tile tr={} tc={} to={}", geom.tr, geom.tc, geom.to);
    let mut out_words = Vec::with_capacity(geom.curr_h * geom.curr_w);
    for i in 0..geom.curr_h {
        for j in 0..geom.curr_w {
            let mut elems = [Q8_8::ZERO; Word256::LANES];
            for oc_local in 0..tile_oc.min(Word256::LANES) {
                let acc = accum.get(oc_local, i, j);
                let affine_out = fixed::narrow_affine(acc, scale_buf[oc_local], bias_buf[oc_local]);
                elems[oc_local] = fixed::activate(affine_out, activation);
            }
            out_words.push(Word256::pack16(&elems));
        }
    }
    Some(out_words)
}
