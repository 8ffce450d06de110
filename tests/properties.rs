//! Property-based checks of the core invariants: determinism,
//! decomposability (tile-size independence), and identity-affine
//! correctness against the golden reference.
#![allow(clippy::pedantic, clippy::nursery)]
#![allow(clippy::unwrap_used)]

mod common;

use conv_tile_engine::{golden, ActivationMode, Engine, Job, JobParams, Q8_8, TileConfig, Word256};
use proptest::prelude::*;

fn params() -> JobParams {
    JobParams {
        ic: 2,
        oc: 3,
        h: 6,
        w: 6,
        k: 3,
        s: 1,
        p: 1,
        use_pool: false,
        pool_stride: 2,
        activation: ActivationMode::Relu,
    }
}

fn raw_tensor_strategy(n: usize) -> impl Strategy<Value = Vec<Word256>> {
    proptest::collection::vec(any::<i16>(), n).prop_map(move |raws| {
        let mut words = vec![Word256::zero(); common::words_for(n)];
        for (i, r) in raws.into_iter().enumerate() {
            words[i / Word256::LANES].set(i % Word256::LANES, Q8_8::from_raw(r));
        }
        words
    })
}

proptest! {
    #[test]
    fn determinism_across_repeated_runs(input in raw_tensor_strategy(2 * 6 * 6)) {
        let p = params();
        let weights = common::build_weights(p.oc, p.ic, p.k);
        let affine = common::build_affine(p.oc, 1.0, 0.0);
        let (oh, ow) = p.final_oh_ow().unwrap();
        let out_len = common::words_for(p.oc * oh * ow);

        let mut out1 = vec![Word256::zero(); out_len];
        let job1 = Job::new(p, &input, &weights, &affine, &mut out1).unwrap();
        Engine::with_defaults().run(job1).unwrap();

        let mut out2 = vec![Word256::zero(); out_len];
        let job2 = Job::new(p, &input, &weights, &affine, &mut out2).unwrap();
        Engine::with_defaults().run(job2).unwrap();

        prop_assert_eq!(out1, out2);
    }

    #[test]
    fn decomposability_is_independent_of_tile_size(input in raw_tensor_strategy(2 * 6 * 6)) {
        let p = params();
        let weights = common::build_weights(p.oc, p.ic, p.k);
        let affine = common::build_affine(p.oc, 1.0, 0.0);
        let (oh, ow) = p.final_oh_ow().unwrap();
        let out_len = common::words_for(p.oc * oh * ow);

        let mut out_default = vec![Word256::zero(); out_len];
        let job_default = Job::new(p, &input, &weights, &affine, &mut out_default).unwrap();
        Engine::new(TileConfig::default(), 64).run(job_default).unwrap();

        let small_config = TileConfig {
            tile_h: 2,
            tile_w: 2,
            tile_ic: 1,
            tile_oc: 2,
        };
        let mut out_small = vec![Word256::zero(); out_len];
        let job_small = Job::new(p, &input, &weights, &affine, &mut out_small).unwrap();
        Engine::new(small_config, 64).run(job_small).unwrap();

        prop_assert_eq!(out_default, out_small);
    }
}

#[test]
fn identity_affine_linear_equals_golden_narrowed_sum() {
    let p = JobParams {
        activation: ActivationMode::Linear,
        ..params()
    };
    let input = common::build_input(p.ic, p.h, p.w);
    let weights = common::build_weights(p.oc, p.ic, p.k);
    let affine = common::build_affine(p.oc, 1.0, 0.0);
    let (oh, ow) = p.final_oh_ow().unwrap();
    let out_len = common::words_for(p.oc * oh * ow);

    let mut hw_out = vec![Word256::zero(); out_len];
    let hw_job = Job::new(p, &input, &weights, &affine, &mut hw_out).unwrap();
    Engine::with_defaults().run(hw_job).unwrap();

    let mut sw_out = vec![Word256::zero(); out_len];
    let sw_job = Job::new(p, &input, &weights, &affine, &mut sw_out).unwrap();
    golden::run(sw_job).unwrap();

    assert_eq!(common::max_abs_diff(&hw_out, &sw_out, p.oc * oh * ow), 0.0);
}
