//! The accelerator core: preallocated on-chip buffers plus the single
//! fallible entry point, [`Engine::run`], that drives one convolution
//! invocation through the Fetch -> Execute -> Write pipeline.

use crate::buffers::{AccumBuffer, InputCache, PsumBuffer, TileConfig, WeightCache};
use crate::error::EngineError;
use crate::job::Job;
use crate::pipeline::{self, DriverInputs};
use crate::schedule::Schedule;
use crate::tensor::{AffineView, InputView, OutputView, WeightView};

/// A tiled fixed-point convolution core for one layer of a Tiny-YOLO
/// style CNN. Built once per tile configuration; every on-chip buffer is
/// allocated at construction and reused by every subsequent [`Engine::run`]
/// call — no allocation happens on the hot path.
pub struct Engine {
    config: TileConfig,
    input_cache: InputCache,
    weight_cache: WeightCache,
    accum: AccumBuffer,
    psum: PsumBuffer,
}

impl Engine {
    /// Build an engine for the given tile edges, with a partial-sum
    /// buffer sized to hold `max_oc_steps` output-channel tiles. Jobs
    /// whose `ceil(OC / tile_oc)` exceeds `max_oc_steps` are rejected by
    /// [`Engine::run`] rather than accepted and truncated.
    #[must_use]
    pub fn new(config: TileConfig, max_oc_steps: usize) -> Self {
        log::debug!(
            "building engine: tile_h={} tile_w={} tile_ic={} tile_oc={} max_oc_steps={}",
            config.tile_h,
            config.tile_w,
            config.tile_ic,
            config.tile_oc,
            max_oc_steps
        );
        Self {
            input_cache: InputCache::new(&config),
            weight_cache: WeightCache::new(&config),
            accum: AccumBuffer::new(&config),
            psum: PsumBuffer::new(&config, max_oc_steps),
            config,
        }
    }

    /// Build an engine at the data model's default tile edges (`16` on
    /// every axis) with room for [`crate::constants::DEFAULT_MAX_OC_STEPS`]
    /// output-channel tiles.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(TileConfig::default(), crate::constants::DEFAULT_MAX_OC_STEPS)
    }

    /// Run one convolution invocation to completion. Returns only after
    /// every output byte has been written. A rejected job (this engine's
    /// partial-sum buffer too small for `job`'s `OC`) leaves `job.output`
    /// untouched.
    pub fn run(&mut self, job: Job<'_>) -> Result<(), EngineError> {
        let params = job.params;
        let (pre_pool_oh, pre_pool_ow) = params.pre_pool_oh_ow()?;
        let (final_oh, final_ow) = params.final_oh_ow()?;

        let schedule = Schedule::new(self.config, params, pre_pool_oh, pre_pool_ow);
        if schedule.oc_tiles() > self.psum.capacity_steps() {
            let err = EngineError::TooManyOutputChannelSteps {
                steps: schedule.oc_tiles(),
                max: self.psum.capacity_steps(),
            };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }

        log::debug!(
            "running job: ic={} oc={} h={} w={} k={} s={} p={} pool={} mode={:?}",
            params.ic,
            params.oc,
            params.h,
            params.w,
            params.k,
            params.s,
            params.p,
            params.use_pool,
            params.activation
        );

        let input_view = InputView::new(job.input, params.ic, params.h, params.w);
        let weight_view = WeightView::new(job.weights, params.ic, params.k);
        let affine_view = AffineView::new(job.affine);
        let mut output_view = OutputView::new(job.output);

        let driver_inputs = DriverInputs {
            schedule: &schedule,
            config: &self.config,
            params: &params,
            input_view: &input_view,
            weight_view: &weight_view,
            affine: &affine_view,
            pre_pool_oh,
            pre_pool_ow,
            final_oh,
            final_ow,
        };

        #[cfg(feature = "pipelined")]
        pipeline::run_pipelined(
            &driver_inputs,
            &mut output_view,
            &mut self.input_cache,
            &mut self.weight_cache,
            &mut self.accum,
            &mut self.psum,
        );

        #[cfg(not(feature = "pipelined"))]
        pipeline::run_sequential(
            &driver_inputs,
            &mut output_view,
            &mut self.input_cache,
            &mut self.weight_cache,
            &mut self.accum,
            &mut self.psum,
        );

        Ok(())
    }
}
