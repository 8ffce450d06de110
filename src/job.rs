//! Per-invocation parameters and the early-rejection validation that must
//! run before any backing-store region is touched.

use crate::error::EngineError;
use crate::fixed::{ActivationMode, Word256};
use crate::tensor::words_for_elements;

/// Geometry and mode for one convolution invocation, independent of the
/// backing-store slices. Shared between [`crate::Engine`] and
/// [`crate::golden`] so both compute the exact same output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobParams {
    /// Input channel count.
    pub ic: usize,
    /// Output channel count.
    pub oc: usize,
    /// Input height.
    pub h: usize,
    /// Input width.
    pub w: usize,
    /// Kernel edge length, one of `{1, 3}`.
    pub k: usize,
    /// Stride, one of `{1, 2}`.
    pub s: usize,
    /// Padding, one of `{0, 1}`.
    pub p: usize,
    /// Whether a trailing 2x2 max-pool is applied.
    pub use_pool: bool,
    /// Pool stride; only `2` is exercised by this core.
    pub pool_stride: usize,
    /// Activation applied on the last IC tile.
    pub activation: ActivationMode,
}

impl JobParams {
    /// Pre-pool output height and width, `(H + 2P - K)/S + 1` each,
    /// requiring exact integer division.
    pub fn pre_pool_oh_ow(&self) -> Result<(usize, usize), EngineError> {
        let bad_shape = || EngineError::NonIntegralOutputShape {
            h: self.h,
            w: self.w,
            k: self.k,
            s: self.s,
            p: self.p,
        };
        let oh = Self::conv_output_dim(self.h, self.k, self.s, self.p).ok_or_else(bad_shape)?;
        let ow = Self::conv_output_dim(self.w, self.k, self.s, self.p).ok_or_else(bad_shape)?;
        Ok((oh, ow))
    }

    fn conv_output_dim(dim: usize, k: usize, s: usize, p: usize) -> Option<usize> {
        let padded = dim + 2 * p;
        let numerator = padded.checked_sub(k)?;
        if numerator % s != 0 {
            return None;
        }
        Some(numerator / s + 1)
    }

    /// Final output height and width after the optional 2x2 pool.
    pub fn final_oh_ow(&self) -> Result<(usize, usize), EngineError> {
        let (oh, ow) = self.pre_pool_oh_ow()?;
        if self.use_pool {
            if oh % 2 != 0 || ow % 2 != 0 {
                return Err(EngineError::OddPooledDimension { oh, ow });
            }
            Ok((oh / 2, ow / 2))
        } else {
            Ok((oh, ow))
        }
    }

    /// Early-rejection validation: parameter ranges only, no tensor
    /// shapes. Must be checked before any memory is touched.
    pub fn validate(&self, k_max: usize) -> Result<(), EngineError> {
        if self.k > k_max {
            let err = EngineError::KernelTooLarge { k: self.k, k_max };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }
        if self.s != 1 && self.s != 2 {
            let err = EngineError::UnsupportedStride { s: self.s };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }
        if self.p != 0 && self.p != 1 {
            let err = EngineError::UnsupportedPadding { p: self.p };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }
        if self.use_pool && self.pool_stride != 2 {
            let err = EngineError::UnsupportedPoolStride {
                stride: self.pool_stride,
            };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }
        self.final_oh_ow().map(|_| ()).inspect_err(|err| {
            log::warn!("rejecting job: {err}");
        })
    }
}

/// One convolution invocation: validated geometry plus the backing-store
/// regions it reads and writes. Constructing a `Job` performs every
/// early-rejection check; a rejected construction never touches `input`,
/// `weights`, `affine`, or `output`.
pub struct Job<'a> {
    /// Validated geometry and mode.
    pub params: JobParams,
    /// Input activations, `[IC, H, W]` packed into `Word256`s.
    pub input: &'a [Word256],
    /// Weights, `[OC, IC, K, K]` packed into `Word256`s.
    pub weights: &'a [Word256],
    /// Fused affine vector, `2*OC` elements packed into `Word256`s.
    pub affine: &'a [Word256],
    /// Output activations, written in tile order.
    pub output: &'a mut [Word256],
}

impl<'a> Job<'a> {
    /// Validate `params` and the four backing-store region lengths,
    /// returning a `Job` ready to run, or an error with no side effect.
    pub fn new(
        params: JobParams,
        input: &'a [Word256],
        weights: &'a [Word256],
        affine: &'a [Word256],
        output: &'a mut [Word256],
    ) -> Result<Self, EngineError> {
        params.validate(crate::constants::K_MAX)?;

        let needed_input = words_for_elements(params.ic * params.h * params.w);
        if input.len() < needed_input {
            let err = EngineError::RegionTooSmall {
                region: "input",
                needed: needed_input,
                got: input.len(),
            };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }

        let needed_weights = words_for_elements(params.oc * params.ic * params.k * params.k);
        if weights.len() < needed_weights {
            let err = EngineError::RegionTooSmall {
                region: "weights",
                needed: needed_weights,
                got: weights.len(),
            };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }

        let needed_affine = words_for_elements(2 * params.oc);
        if affine.len() < needed_affine {
            let err = EngineError::RegionTooSmall {
                region: "affine",
                needed: needed_affine,
                got: affine.len(),
            };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }

        let (final_oh, final_ow) = params.final_oh_ow()?;
        let needed_output = words_for_elements(params.oc * final_oh * final_ow);
        if output.len() < needed_output {
            let err = EngineError::RegionTooSmall {
                region: "output",
                needed: needed_output,
                got: output.len(),
            };
            log::warn!("rejecting job: {err}");
            return Err(err);
        }

        debug_assert!(
            !std::ptr::eq(output.as_ptr().cast::<()>(), input.as_ptr().cast::<()>()),
            "output region must not alias input"
        );
        debug_assert!(
            !std::ptr::eq(output.as_ptr().cast::<()>(), weights.as_ptr().cast::<()>()),
            "output region must not alias weights"
        );

        Ok(Self {
            params,
            input,
            weights,
            affine,
            output,
        })
    }
}
