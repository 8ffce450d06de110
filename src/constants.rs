//! Engine-wide tiling and geometry constants.
//!
//! Mirrors the sizing rules fixed by the data model: a tile edge of 16
//! elements, a cache window wide enough to cover the worst-case stride-2
//! receptive field, and a hard cap on the kernel size and stride this
//! core accepts.

/// Output-tile edge length, both row and column direction.
pub const TILE_H: usize = 16;
/// Output-tile edge length, both row and column direction.
pub const TILE_W: usize = 16;
/// Input-channel tile depth.
pub const TILE_IC: usize = 16;
/// Output-channel tile depth.
pub const TILE_OC: usize = 16;

/// Largest supported convolution kernel edge.
pub const K_MAX: usize = 3;
/// Largest supported stride.
pub const MAX_STRIDE: usize = 2;

/// Input cache edge length: enough rows/columns to cover a `TILE_H`/`TILE_W`
/// output tile at the maximum stride with the maximum kernel size,
/// `TILE * MAX_STRIDE + K_MAX - 1`.
pub const CACHE_DIM: usize = TILE_H * MAX_STRIDE + K_MAX - 1;

/// Lanes packed into one [`crate::fixed::Word256`].
pub const WORD_LANES: usize = 16;

/// Default bound on `ceil(OC / TILE_OC)` the partial-sum buffer is sized
/// for; matches the "supported model" ceiling named in the data model.
pub const DEFAULT_MAX_OC_STEPS: usize = 64;
