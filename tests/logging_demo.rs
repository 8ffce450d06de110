//! Demonstrates the `log` records `Engine` emits at invocation boundaries.
//! Ignored by default — run with `cargo test --test logging_demo --
//! --ignored --nocapture` to see output, since asserting on log content
//! is brittle and not the point of this test.
#![allow(clippy::pedantic, clippy::nursery)]
#![allow(clippy::unwrap_used)]

mod common;

use conv_tile_engine::{ActivationMode, Engine, Job, JobParams, Word256};

#[test]
#[ignore]
fn engine_run_logs_its_invocation_shape() {
    let _ = env_logger::builder().is_test(true).try_init();

    let params = JobParams {
        ic: 3,
        oc: 16,
        h: 16,
        w: 16,
        k: 3,
        s: 1,
        p: 1,
        use_pool: false,
        pool_stride: 2,
        activation: ActivationMode::Relu,
    };
    let input = common::build_input(params.ic, params.h, params.w);
    let weights = common::build_weights(params.oc, params.ic, params.k);
    let affine = common::build_affine(params.oc, 1.0, 0.0);
    let (oh, ow) = params.final_oh_ow().unwrap();
    let mut output = vec![Word256::zero(); common::words_for(params.oc * oh * ow)];

    let job = Job::new(params, &input, &weights, &affine, &mut output).unwrap();
    Engine::with_defaults().run(job).unwrap();
}
