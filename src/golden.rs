//! Scalar, bit-exact reference implementation of one convolution
//! invocation. Used only by the test suite to check [`crate::Engine`]
//! against: same zero-padding rule, same fixed-point primitives, same
//! affine-then-activation-then-pool pipeline, computed the straightforward
//! way instead of tiled. Any element-wise divergence from [`crate::Engine`]
//! is a bug in one of the two, never an acceptable "close enough" result.

use crate::fixed::{self, Q16_16, Q8_8};
use crate::job::Job;
use crate::error::EngineError;
use crate::tensor::{word_lane, AffineView, InputView, OutputView, WeightView};

/// Run `job` through the scalar reference path, writing `job.output` in
/// the same layout [`crate::Engine::run`] would.
pub fn run(job: Job<'_>) -> Result<(), EngineError> {
    let params = job.params;
    let (pre_pool_oh, pre_pool_ow) = params.pre_pool_oh_ow()?;
    let (final_oh, final_ow) = params.final_oh_ow()?;

    log::debug!(
        "golden reference: ic={} oc={} h={} w={} k={} s={} p={}",
        params.ic,
        params.oc,
        params.h,
        params.w,
        params.k,
        params.s,
        params.p
    );

    let input_view = InputView::new(job.input, params.ic, params.h, params.w);
    let weight_view = WeightView::new(job.weights, params.ic, params.k);
    let affine_view = AffineView::new(job.affine);
    let mut output_view = OutputView::new(job.output);

    let mut pre_pool = vec![Q8_8::ZERO; params.oc * pre_pool_oh * pre_pool_ow];
    for oc in 0..params.oc {
        let scale = affine_view.scale(oc);
        let bias = affine_view.bias(oc);
        for oh in 0..pre_pool_oh {
            for ow in 0..pre_pool_ow {
                let acc = convolve_one(&input_view, &weight_view, &params, oc, oh, ow);
                let narrowed = fixed::narrow_affine(acc, scale, bias);
                let activated = fixed::activate(narrowed, params.activation);
                pre_pool[(oc * pre_pool_oh + oh) * pre_pool_ow + ow] = activated;
            }
        }
    }

    for oc in 0..params.oc {
        for oh in 0..final_oh {
            for ow in 0..final_ow {
                let value = if params.use_pool {
                    pool_2x2(&pre_pool, pre_pool_oh, pre_pool_ow, oc, oh, ow)
                } else {
                    pre_pool[(oc * pre_pool_oh + oh) * pre_pool_ow + ow]
                };
                let flat = (oc * final_oh + oh) * final_ow + ow;
                write_scalar(&mut output_view, flat, value);
            }
        }
    }

    Ok(())
}

/// `Σ_{ic, ky, kx} w[oc][ic][ky][kx] * x[ic][oh*S+ky-P][ow*S+kx-P]`, with
/// the same zero-padding rule the Fetch stage uses.
fn convolve_one(
    input: &InputView<'_>,
    weights: &WeightView<'_>,
    params: &crate::job::JobParams,
    oc: usize,
    oh: usize,
    ow: usize,
) -> Q16_16 {
    let mut acc = Q16_16::ZERO;
    for ic in 0..params.ic {
        for ky in 0..params.k {
            for kx in 0..params.k {
                #[allow(clippy::cast_possible_wrap)]
                let r = (oh * params.s + ky) as i64 - params.p as i64;
                #[allow(clippy::cast_possible_wrap)]
                let c = (ow * params.s + kx) as i64 - params.p as i64;
                #[allow(clippy::cast_possible_wrap)]
                let ic_signed = ic as i64;
                let x = input.get_or_zero(ic_signed, r, c);
                let w = weights.get(oc, ic, ky, kx);
                acc = fixed::mac(acc, w, x);
            }
        }
    }
    acc
}

fn pool_2x2(pre_pool: &[Q8_8], pre_pool_oh: usize, pre_pool_ow: usize, oc: usize, oh: usize, ow: usize) -> Q8_8 {
    let row0 = (oc * pre_pool_oh + 2 * oh) * pre_pool_ow;
    let row1 = (oc * pre_pool_oh + 2 * oh + 1) * pre_pool_ow;
    let a = pre_pool[row0 + 2 * ow];
    let b = pre_pool[row0 + 2 * ow + 1];
    let c = pre_pool[row1 + 2 * ow];
    let d = pre_pool[row1 + 2 * ow + 1];
    a.max(b).max(c).max(d)
}

fn write_scalar(output: &mut OutputView, flat: usize, value: Q8_8) {
    let (word, lane) = word_lane(flat);
    let mut w = output.read_word(word);
    w.set(lane, value);
    output.write_word(word, w);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixed::{ActivationMode, Word256};
    use crate::job::JobParams;
    use crate::tensor::words_for_elements;

    #[test]
    fn identity_kernel_passes_input_through() {
        let params = JobParams {
            ic: 1,
            oc: 1,
            h: 2,
            w: 2,
            k: 1,
            s: 1,
            p: 0,
            use_pool: false,
            pool_stride: 2,
            activation: ActivationMode::Linear,
        };
        let mut input = vec![Word256::zero(); words_for_elements(params.ic * params.h * params.w)];
        input[0].set(0, Q8_8::from_f64(1.25));
        let mut weights =
            vec![Word256::zero(); words_for_elements(params.oc * params.ic * params.k * params.k)];
        weights[0].set(0, Q8_8::from_f64(1.0));
        let mut affine = vec![Word256::zero(); words_for_elements(2 * params.oc)];
        affine[0].set(0, Q8_8::from_f64(1.0));
        let (oh, ow) = params.final_oh_ow().unwrap();
        let mut output = vec![Word256::zero(); words_for_elements(params.oc * oh * ow)];

        let job = Job::new(params, &input, &weights, &affine, &mut output).unwrap();
        run(job).unwrap();

        assert_eq!(output[0].get(0).to_f64(), 1.25);
    }

    #[test]
    fn pooling_takes_the_max_of_each_2x2_block() {
        let params = JobParams {
            ic: 1,
            oc: 1,
            h: 2,
            w: 2,
            k: 1,
            s: 1,
            p: 0,
            use_pool: true,
            pool_stride: 2,
            activation: ActivationMode::Linear,
        };
        let mut input = vec![Word256::zero(); words_for_elements(params.ic * params.h * params.w)];
        input[0].set(0, Q8_8::from_f64(1.0));
        input[0].set(1, Q8_8::from_f64(3.0));
        input[0].set(2, Q8_8::from_f64(2.0));
        input[0].set(3, Q8_8::from_f64(0.5));
        let mut weights =
            vec![Word256::zero(); words_for_elements(params.oc * params.ic * params.k * params.k)];
        weights[0].set(0, Q8_8::from_f64(1.0));
        let mut affine = vec![Word256::zero(); words_for_elements(2 * params.oc)];
        affine[0].set(0, Q8_8::from_f64(1.0));
        let (oh, ow) = params.final_oh_ow().unwrap();
        assert_eq!((oh, ow), (1, 1));
        let mut output = vec![Word256::zero(); words_for_elements(params.oc * oh * ow)];

        let job = Job::new(params, &input, &weights, &affine, &mut output).unwrap();
        run(job).unwrap();

        assert_eq!(output[0].get(0).to_f64(), 3.0);
    }
}
