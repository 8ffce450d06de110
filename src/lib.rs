//! A tiled, fixed-point convolution core for one layer of a Tiny-YOLO
//! style CNN accelerator. Every invocation consumes an input activation
//! volume, a weight tensor, and a fused-affine (BatchNorm) vector, and
//! produces an output activation volume, optionally followed by a 2x2
//! max-pool.
//!
//! All arithmetic is Q8.8 signed fixed-point with round-to-nearest-even
//! saturating rounding, accumulated in a Q16.16 domain. The engine and
//! the [`golden`] reference share the same fixed-point primitives, so the
//! two paths cannot numerically diverge.
//!
//! ```
//! use conv_tile_engine::{ActivationMode, Engine, Job, JobParams, Q8_8, Word256};
//!
//! let params = JobParams {
//!     ic: 1,
//!     oc: 1,
//!     h: 3,
//!     w: 3,
//!     k: 3,
//!     s: 1,
//!     p: 1,
//!     use_pool: false,
//!     pool_stride: 2,
//!     activation: ActivationMode::Linear,
//! };
//! let input = vec![Word256::zero(); 1];
//! let mut weights = vec![Word256::zero(); 1];
//! weights[0].set(4, Q8_8::from_f64(1.0));
//! let mut affine = vec![Word256::zero(); 1];
//! affine[0].set(0, Q8_8::from_f64(1.0));
//! let mut output = vec![Word256::zero(); 1];
//!
//! let job = Job::new(params, &input, &weights, &affine, &mut output)?;
//! let mut engine = Engine::with_defaults();
//! engine.run(job)?;
//! # Ok::<(), conv_tile_engine::EngineError>(())
//! ```

pub mod constants;
mod fixed;
mod tensor;

mod buffers;
mod error;
mod job;
mod schedule;

mod pipeline;

mod engine;

#[cfg(feature = "golden")]
pub mod golden;

pub use buffers::TileConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use fixed::{ActivationMode, Q16_16, Q8_8, Word256};
pub use job::{Job, JobParams};
